use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::Summarize;

const CLAUDE_API_URL: &str = "https://api.anthropic.com/v1/messages";
const CLAUDE_MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_CONTENT_CHARS: usize = 10000;

const SYSTEM_PROMPT: &str = "You are an assistant that writes concise factual summaries.";

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

pub struct Summarizer {
    client: Client,
    api_key: String,
}

impl Summarizer {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, api_key }
    }

    pub fn model_version(&self) -> &'static str {
        CLAUDE_MODEL
    }
}

#[async_trait]
impl Summarize for Summarizer {
    async fn summarize(&self, title: &str, content: &str) -> Result<String> {
        if content.trim().is_empty() {
            return Err(AppError::ClaudeApi(
                "article content is required to generate a summary".to_string(),
            ));
        }

        let request = MessageRequest {
            model: CLAUDE_MODEL.to_string(),
            max_tokens: 256,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(title, content),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
        };

        let response = self
            .client
            .post(CLAUDE_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(AppError::ClaudeApi(format!("API error: {}", error_text)));
        }

        let message_response: MessageResponse = response.json().await?;

        let summary = message_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(summary.trim().to_string())
    }
}

fn build_prompt(title: &str, content: &str) -> String {
    format!(
        "Summarize the following wiki article in 1-2 concise sentences. \
         Cover the main idea and the details a reader should remember, without opinions \
         or unrelated information, so readers can decide whether to read the whole article.\n\n\
         <title>\n{}</title>\n\n<wiki_content>\n{}</wiki_content>",
        title,
        truncate_chars(content, MAX_CONTENT_CHARS)
    )
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
