use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::Identity;

const STACK_API_URL: &str = "https://api.stack-auth.com/api/v1";

/// Resolves the caller behind a session access token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the request is anonymous or the token is not accepted.
    async fn current_caller(&self, access_token: Option<&str>) -> Result<Option<Identity>>;
}

/// Used when no identity provider is configured: every caller is anonymous.
pub struct Anonymous;

#[async_trait]
impl IdentityProvider for Anonymous {
    async fn current_caller(&self, _access_token: Option<&str>) -> Result<Option<Identity>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct StackUser {
    id: String,
    display_name: Option<String>,
    primary_email: Option<String>,
}

pub struct StackAuth {
    client: Client,
    project_id: String,
    secret_server_key: String,
}

impl StackAuth {
    pub fn new(project_id: String, secret_server_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            project_id,
            secret_server_key,
        }
    }
}

#[async_trait]
impl IdentityProvider for StackAuth {
    async fn current_caller(&self, access_token: Option<&str>) -> Result<Option<Identity>> {
        let Some(token) = access_token else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/users/me", STACK_API_URL))
            .header("x-stack-access-type", "server")
            .header("x-stack-project-id", &self.project_id)
            .header("x-stack-secret-server-key", &self.secret_server_key)
            .header("x-stack-access-token", token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user: StackUser = response.json().await?;
                Ok(Some(Identity {
                    id: user.id,
                    display_name: user.display_name,
                    email: user.primary_email,
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                tracing::debug!("Access token rejected by identity provider");
                Ok(None)
            }
            status => {
                let error_text = response.text().await?;
                Err(AppError::Identity(format!("HTTP {}: {}", status, error_text)))
            }
        }
    }
}
