use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};

const BLOB_API_URL: &str = "https://blob.vercel-storage.com";
const BLOB_API_VERSION: &str = "7";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredBlob {
    pub url: String,
    pub pathname: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` publicly under a randomized name derived from `filename`.
    async fn put(&self, filename: &str, content_type: &str, data: Bytes) -> Result<StoredBlob>;
}

pub struct VercelBlobStore {
    client: Client,
    token: String,
}

impl VercelBlobStore {
    pub fn new(token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, token }
    }
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    async fn put(&self, filename: &str, content_type: &str, data: Bytes) -> Result<StoredBlob> {
        let response = self
            .client
            .put(format!("{}/{}", BLOB_API_URL, urlencoding::encode(filename)))
            .bearer_auth(&self.token)
            .header("x-api-version", BLOB_API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "1")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::Blob(format!("API error: {}", error_text)));
        }

        Ok(response.json().await?)
    }
}
