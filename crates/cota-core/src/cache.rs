//! Cache trait for storing raw provider responses.
//!
//! This module defines the [`ResponseCache`] trait that providers consult
//! before going to the network. The cache is an optimization, never a
//! correctness requirement: a failing cache read is treated like a miss.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Trait for caching raw provider response bodies.
///
/// Entries are keyed by `(provider, key)` where `key` identifies the request
/// (an endpoint path or URL without credentials). Implementations can store
/// data in various backends (SQLite, in-memory, etc.).
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Retrieves a cached response body.
    ///
    /// Returns `Ok(Some(body))` on a hit, `Ok(None)` on a miss.
    async fn get(&self, provider: &str, key: &str) -> Result<Option<String>>;

    /// Stores a response body, replacing any previous entry for the key.
    async fn put(&self, provider: &str, key: &str, body: &str) -> Result<()>;

    /// Removes cache entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}
