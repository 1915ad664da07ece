//! No-op cache implementation.

use async_trait::async_trait;
use cota_core::{ResponseCache, Result};
use std::time::Duration;

/// A cache that stores nothing.
///
/// Useful when caching should be disabled without changing the fetch code
/// path: every `get` is a miss and every `put` succeeds silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseCache for NoopCache {
    async fn get(&self, _provider: &str, _key: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn put(&self, _provider: &str, _key: &str, _body: &str) -> Result<()> {
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
