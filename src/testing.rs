//! In-process stand-ins for the external collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, Notify};

use crate::ai::Summarize;
use crate::cache::{KvCache, MemoryCache, ARTICLE_LIST_KEY};
use crate::error::{AppError, Result};
use crate::models::Identity;
use crate::services::blob::StoredBlob;
use crate::services::{BlobStore, Celebrate, IdentityProvider};

/// Always answers with the same summary and counts calls.
pub struct StaticSummarizer {
    pub summary: String,
    pub calls: AtomicUsize,
}

impl StaticSummarizer {
    pub fn new(summary: &str) -> Arc<Self> {
        Arc::new(Self {
            summary: summary.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarize for StaticSummarizer {
    async fn summarize(&self, _title: &str, _content: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary.clone())
    }
}

pub struct FailingSummarizer;

#[async_trait]
impl Summarize for FailingSummarizer {
    async fn summarize(&self, _title: &str, _content: &str) -> Result<String> {
        Err(AppError::ClaudeApi("model unavailable".to_string()))
    }
}

/// Fails for any article whose title contains `poison`, echoes the title otherwise.
pub struct SelectiveSummarizer {
    pub poison: String,
}

#[async_trait]
impl Summarize for SelectiveSummarizer {
    async fn summarize(&self, title: &str, _content: &str) -> Result<String> {
        if title.contains(&self.poison) {
            Err(AppError::ClaudeApi("rate limited".to_string()))
        } else {
            Ok(format!("About {}", title))
        }
    }
}

/// Forwards every celebration to a channel.
pub struct RecordingCelebrations {
    tx: mpsc::UnboundedSender<(i64, i64)>,
}

impl RecordingCelebrations {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(i64, i64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Celebrate for RecordingCelebrations {
    async fn celebrate(&self, article_id: i64, pageviews: i64) -> Result<()> {
        let _ = self.tx.send((article_id, pageviews));
        Ok(())
    }
}

/// A celebration that never finishes, for checking the view path does not wait on it.
pub struct StalledCelebrations;

#[async_trait]
impl Celebrate for StalledCelebrations {
    async fn celebrate(&self, _article_id: i64, _pageviews: i64) -> Result<()> {
        futures::future::pending::<()>().await;
        Ok(())
    }
}

/// Memory cache whose writes and deletes can be switched off, counting deletes of each key.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    pub fail_writes: bool,
    pub fail_deletes: bool,
    deletes: Mutex<Vec<String>>,
}

impl FlakyCache {
    pub fn failing(fail_writes: bool, fail_deletes: bool) -> Self {
        Self {
            fail_writes,
            fail_deletes,
            ..Self::default()
        }
    }

    pub fn deletes_of(&self, key: &str) -> usize {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }
}

#[async_trait]
impl KvCache for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if self.fail_writes {
            return Err(AppError::Cache("connection reset".to_string()));
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        if self.fail_deletes {
            return Err(AppError::Cache("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.inner.incr(key).await
    }
}

/// Memory cache that can pause the next article listing fill until released.
#[derive(Default)]
pub struct GatedCache {
    inner: MemoryCache,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

impl GatedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold_next_fill(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Waits until a held fill has started.
    pub async fn fill_reached(&self) {
        self.reached.notified().await;
    }

    pub fn release_fill(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl KvCache for GatedCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if key == ARTICLE_LIST_KEY && self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        self.inner.incr(key).await
    }
}

/// Treats the bearer token as the caller id.
pub struct TokenIsUserId;

#[async_trait]
impl IdentityProvider for TokenIsUserId {
    async fn current_caller(&self, access_token: Option<&str>) -> Result<Option<Identity>> {
        Ok(access_token.map(identity))
    }
}

pub struct RecordingBlobStore {
    pub stored: Mutex<Vec<(String, String, usize)>>,
}

impl RecordingBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            stored: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn put(&self, filename: &str, content_type: &str, data: Bytes) -> Result<StoredBlob> {
        self.stored
            .lock()
            .unwrap()
            .push((filename.to_string(), content_type.to_string(), data.len()));
        let pathname = format!("abc123-{}", filename);
        Ok(StoredBlob {
            url: format!("https://blobs.example/{}", pathname),
            pathname,
        })
    }
}

pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        display_name: Some(format!("{} name", id)),
        email: Some(format!("{}@example.com", id)),
    }
}
