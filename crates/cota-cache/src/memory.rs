//! In-memory cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cota_core::{ResponseCache, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry {
    body: String,
    cached_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(body: String) -> Self {
        Self {
            body,
            cached_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Simple in-memory response cache for testing and development.
///
/// Entries are stored in an `RwLock`-protected `HashMap` keyed by
/// `(provider, key)` and are lost when the cache is dropped.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl InMemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCache for InMemoryCache {
    async fn get(&self, provider: &str, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        match entries.get(&(provider.to_string(), key.to_string())) {
            Some(entry) => {
                debug!(provider, key, "Response cache hit");
                Ok(Some(entry.body.clone()))
            }
            None => {
                debug!(provider, key, "Response cache miss");
                Ok(None)
            }
        }
    }

    async fn put(&self, provider: &str, key: &str, body: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            (provider.to_string(), key.to_string()),
            CacheEntry::new(body.to_string()),
        );
        Ok(())
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(ttl));
        Ok(before - entries.len())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("yahoo", "k").await.unwrap(), None);

        cache.put("yahoo", "k", "body").await.unwrap();
        assert_eq!(
            cache.get("yahoo", "k").await.unwrap(),
            Some("body".to_string())
        );
        assert_eq!(cache.get("brapi", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalidate_stale_respects_ttl() {
        let cache = InMemoryCache::new();
        cache.put("yahoo", "k", "body").await.unwrap();

        // Fresh entry survives a generous TTL
        let removed = cache
            .invalidate_stale(Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(removed, 0);
        assert!(cache.get("yahoo", "k").await.unwrap().is_some());

        // A zero TTL marks everything stale
        let removed = cache.invalidate_stale(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.get("yahoo", "k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let cache = InMemoryCache::new();
        cache.put("a", "1", "x").await.unwrap();
        cache.put("b", "2", "y").await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.get("a", "1").await.unwrap(), None);
        assert_eq!(cache.get("b", "2").await.unwrap(), None);
    }
}
