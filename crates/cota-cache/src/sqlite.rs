//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::Utc;
use cota_core::{ProviderError, ResponseCache, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// SQLite-based cache for raw provider responses.
///
/// Stores response bodies in a single database file, providing persistence
/// across application restarts. The connection is shared behind a `Mutex`;
/// construction is idempotent, so several components may open the same file.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| ProviderError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| ProviderError::Cache(e.to_string()))?;
        let cache = Self {
            conn: Mutex::new(conn),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS response_cache (
                provider TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (provider, key)
            )",
            [],
        )
        .map_err(|e| ProviderError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_response_cached_at
             ON response_cache(cached_at)",
            [],
        )
        .map_err(|e| ProviderError::Cache(e.to_string()))?;

        debug!("SQLite response cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for SqliteCache {
    async fn get(&self, provider: &str, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM response_cache WHERE provider = ?1 AND key = ?2",
                params![provider, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        if body.is_some() {
            debug!(provider, key, "Response cache hit");
        }
        Ok(body)
    }

    async fn put(&self, provider: &str, key: &str, body: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO response_cache (provider, key, body, cached_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![provider, key, body, Utc::now().to_rfc3339()],
        )
        .map_err(|e| ProviderError::Cache(e.to_string()))?;

        debug!(provider, key, bytes = body.len(), "Cached response");
        Ok(())
    }

    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let delta = chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(delta)
            .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

        let conn = self
            .conn
            .lock()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        let removed = conn
            .execute(
                "DELETE FROM response_cache WHERE cached_at < ?1",
                params![cutoff.to_rfc3339()],
            )
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        debug!(removed, "Invalidated stale cache entries");
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ProviderError::Cache(e.to_string()))?;

        conn.execute("DELETE FROM response_cache", [])
            .map_err(|e| ProviderError::Cache(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip() {
        let cache = SqliteCache::in_memory().unwrap();

        assert_eq!(cache.get("yahoo", "chart/PETR4.SA").await.unwrap(), None);

        cache
            .put("yahoo", "chart/PETR4.SA", "{\"chart\":{}}")
            .await
            .unwrap();
        assert_eq!(
            cache.get("yahoo", "chart/PETR4.SA").await.unwrap(),
            Some("{\"chart\":{}}".to_string())
        );

        // Keys are namespaced by provider
        assert_eq!(cache.get("brapi", "chart/PETR4.SA").await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_overwrites() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("brapi", "quote/MXRF11", "v1").await.unwrap();
        cache.put("brapi", "quote/MXRF11", "v2").await.unwrap();
        assert_eq!(
            cache.get("brapi", "quote/MXRF11").await.unwrap(),
            Some("v2".to_string())
        );
    }

    #[tokio::test]
    async fn invalidate_with_zero_ttl_removes_everything() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("yahoo", "a", "1").await.unwrap();
        cache.put("yahoo", "b", "2").await.unwrap();

        let removed = cache.invalidate_stale(Duration::ZERO).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.get("yahoo", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let cache = SqliteCache::in_memory().unwrap();
        cache.put("yahoo", "a", "1").await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(cache.get("yahoo", "a").await.unwrap(), None);
    }
}
