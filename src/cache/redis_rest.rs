use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

use super::KvCache;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Value,
    error: Option<String>,
}

/// Redis reached through an HTTP endpoint that accepts a JSON command array
/// (`["SET", "key", "value", "EX", "60"]`) and answers `{"result": ...}`.
pub struct RedisRestCache {
    client: Client,
    url: String,
    token: String,
}

impl RedisRestCache {
    pub fn new(url: String, token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn command(&self, args: Vec<String>) -> Result<Value> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        let body: CommandResponse = response.json().await?;
        decode(&args[0], status, body)
    }
}

fn command_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

fn set_command(key: &str, value: &str, ttl: Duration) -> Vec<String> {
    // EX takes whole seconds and rejects 0.
    let seconds = ttl.as_secs().max(1).to_string();
    command_args(&["SET", key, value, "EX", &seconds])
}

fn decode(name: &str, status: StatusCode, body: CommandResponse) -> Result<Value> {
    if let Some(error) = body.error {
        return Err(AppError::Cache(format!("{} failed: {}", name, error)));
    }
    if !status.is_success() {
        return Err(AppError::Cache(format!("{} failed: HTTP {}", name, status)));
    }
    Ok(body.result)
}

fn decode_get(result: Value) -> Option<String> {
    match result {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn decode_incr(result: Value) -> Result<i64> {
    result
        .as_i64()
        .ok_or_else(|| AppError::Cache(format!("INCR returned non-integer: {}", result)))
}

#[async_trait]
impl KvCache for RedisRestCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.command(command_args(&["GET", key])).await?;
        Ok(decode_get(result))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.command(set_command(key, value, ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.command(command_args(&["DEL", key])).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let result = self.command(command_args(&["INCR", key])).await?;
        decode_incr(result)
    }
}
