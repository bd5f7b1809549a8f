//! Key-value cache seam.
//!
//! Holds the cached article listing and the per-article pageview counters.
//! [`RedisRestCache`] talks to a hosted Redis over its REST interface;
//! [`MemoryCache`] keeps everything in-process for local runs and tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

mod memory;
mod redis_rest;

pub use memory::MemoryCache;
pub use redis_rest::RedisRestCache;

/// Key of the serialized article listing.
pub const ARTICLE_LIST_KEY: &str = "articles:all";

/// Counter bumped on every listing invalidation. A cached listing is only served
/// while the generation it was filled under is still current.
pub const ARTICLE_LIST_GENERATION_KEY: &str = "articles:all:gen";

pub fn pageview_key(article_id: i64) -> String {
    format!("pageviews:article:{}", article_id)
}

#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value`, expiring it after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically adds one to the integer at `key` (missing counts as 0) and returns the new value.
    async fn incr(&self, key: &str) -> Result<i64>;
}
