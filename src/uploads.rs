use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::services::BlobStore;

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub size: usize,
    pub content_type: String,
    pub filename: String,
}

/// Validates article images and hands them to blob storage.
pub struct UploadService {
    store: Option<Arc<dyn BlobStore>>,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(store: Option<Arc<dyn BlobStore>>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub async fn upload(
        &self,
        caller: Option<&Identity>,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<UploadedFile> {
        let caller = caller.ok_or(AppError::Unauthorized)?;

        let content_type = match content_type {
            Some(ct) if !ct.is_empty() => ct.to_string(),
            _ => mime_guess::from_path(filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::InvalidUpload("Invalid file type".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(AppError::InvalidUpload("File too large".to_string()));
        }

        let Some(store) = &self.store else {
            return Err(AppError::Blob("blob storage is not configured".to_string()));
        };

        tracing::info!(
            "Uploading {} ({} bytes, {}) for {}",
            filename,
            data.len(),
            content_type,
            caller.id
        );

        let size = data.len();
        let blob = store.put(filename, &content_type, data).await?;

        Ok(UploadedFile {
            url: blob.url,
            size,
            content_type,
            filename: blob.pathname,
        })
    }
}
