use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use moka::Expiry;

use crate::error::{AppError, Result};

use super::KvCache;

const MAX_ENTRIES: u64 = 100_000;

#[derive(Clone)]
struct Entry {
    value: String,
    // Counters carry no TTL of their own and keep whatever expiry they already had.
    ttl: Option<Duration>,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl.or(duration_until_expiry)
    }
}

/// In-process cache used when no Redis is configured.
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .expire_after(EntryExpiry)
                .build(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: Some(ttl),
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current {
                    None => Op::Put(Entry {
                        value: "1".to_string(),
                        ttl: None,
                    }),
                    Some(entry) => match entry.value().value.parse::<i64>() {
                        Ok(n) => Op::Put(Entry {
                            value: (n + 1).to_string(),
                            ttl: None,
                        }),
                        Err(_) => Op::Nop,
                    },
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => {
                entry.into_value().value.parse::<i64>().map_err(|_| {
                    AppError::Cache(format!("value at {} is not an integer", key))
                })
            }
            _ => Err(AppError::Cache(format!("value at {} is not an integer", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("short", "v", Duration::from_millis(100)).await.unwrap();
        cache.set("long", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("short").await.unwrap().as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(cache.get("short").await.unwrap(), None);
        assert_eq!(cache.get("long").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn incr_keeps_the_existing_expiry() {
        let cache = MemoryCache::new();
        cache.set("n", "4", Duration::from_millis(100)).await.unwrap();
        assert_eq!(cache.incr("n").await.unwrap(), 5);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(cache.get("n").await.unwrap(), None);
        assert_eq!(cache.incr("n").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = MemoryCache::new();
        cache.set("k", "v", Duration::from_secs(60)).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("missing").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_starts_at_one_and_rejects_non_integers() {
        let cache = MemoryCache::new();
        assert_eq!(cache.incr("n").await.unwrap(), 1);
        assert_eq!(cache.incr("n").await.unwrap(), 2);
        assert_eq!(cache.get("n").await.unwrap().as_deref(), Some("2"));

        cache.set("s", "text", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(cache.incr("s").await, Err(AppError::Cache(_))));
        assert_eq!(cache.get("s").await.unwrap().as_deref(), Some("text"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let cache = Arc::new(MemoryCache::new());
        let tasks: Vec<_> = (0..200)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.incr("hot").await.unwrap() })
            })
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            seen.push(task.await.unwrap());
        }
        seen.sort_unstable();

        assert_eq!(seen, (1..=200).collect::<Vec<i64>>());
        assert_eq!(cache.get("hot").await.unwrap().as_deref(), Some("200"));
    }
}
