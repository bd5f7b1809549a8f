mod summarizer;

use async_trait::async_trait;

use crate::error::Result;

pub use summarizer::Summarizer;

/// Produces a short summary of an article. Callers treat failures as best-effort.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, title: &str, content: &str) -> Result<String>;
}
