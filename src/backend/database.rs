//! Relational-table cache backend (SQLite via sqlx).
//!
//! Entries live in a single table:
//!
//! ```text
//! CREATE TABLE <table> (key TEXT PRIMARY KEY, value BLOB, expiration INTEGER)
//! ```
//!
//! `expiration` is an absolute Unix timestamp; entries that never expire use
//! the same far-future sentinel as the file backend. Expired rows are deleted
//! when read. The key prefix lets several applications share one table.

use super::{ttl_seconds, CacheBackend};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Expiration stored for entries without a TTL.
pub const FOREVER_TIMESTAMP: i64 = 9_999_999_999;

/// Configuration for the database backend.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String, // e.g., "sqlite://cache.db?mode=rwc"
    pub table: String,
    pub prefix: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            table: "cache".to_string(),
            prefix: String::new(),
            pool_size: 1,
        }
    }
}

/// Cache backend storing entries in a SQL table.
#[derive(Clone)]
pub struct DatabaseBackend {
    pool: SqlitePool,
    table: String,
    prefix: String,
    clock: Arc<dyn Clock>,
}

fn db_error(op: &str, e: sqlx::Error) -> Error {
    Error::BackendError(format!("Database {} failed: {}", op, e))
}

fn validate_table(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("Invalid cache table name: {}", table)))
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Pool settings for a config.
///
/// An in-memory database lives only as long as its connection and is private
/// to it, so such a pool holds exactly one connection that is never reaped
/// or recycled.
fn pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    let options = SqlitePoolOptions::new();
    if is_in_memory(&config.url) {
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options.max_connections(config.pool_size.max(1))
    }
}

impl DatabaseBackend {
    /// Connect and make sure the cache table exists.
    ///
    /// # Errors
    /// - `Error::ConfigError`: table name is not a plain identifier
    /// - `Error::BackendError`: connection or DDL fails
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        validate_table(&config.table)?;

        let pool = pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| db_error("CONNECT", e))?;

        Self::with_pool(pool, config, SystemClock).await
    }

    /// Build on an existing pool with an explicit time source.
    pub async fn with_pool(
        pool: SqlitePool,
        config: &DatabaseConfig,
        clock: impl Clock,
    ) -> Result<Self> {
        validate_table(&config.table)?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, value BLOB NOT NULL, expiration INTEGER NOT NULL)",
            config.table
        );
        sqlx::query(&ddl)
            .execute(&pool)
            .await
            .map_err(|e| db_error("CREATE TABLE", e))?;

        info!("✓ Database backend initialized (table: {})", config.table);

        Ok(DatabaseBackend {
            pool,
            table: config.table.clone(),
            prefix: config.prefix.clone(),
            clock: Arc::new(clock),
        })
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn expiration(&self, minutes: u64) -> i64 {
        if minutes == 0 {
            return FOREVER_TIMESTAMP;
        }

        let at = self.clock.now().saturating_add(ttl_seconds(minutes));
        i64::try_from(at)
            .unwrap_or(FOREVER_TIMESTAMP)
            .min(FOREVER_TIMESTAMP)
    }
}

impl CacheBackend for DatabaseBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let address = self.prefixed(key);
        let sql = format!("SELECT value, expiration FROM {} WHERE key = ?", self.table);

        let row: Option<(Vec<u8>, i64)> = sqlx::query_as(&sql)
            .bind(&address)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("SELECT", e))?;

        let Some((value, expiration)) = row else {
            debug!("✓ Database GET {} -> MISS", key);
            return Ok(None);
        };

        if self.clock.now() as i64 >= expiration {
            debug!("✓ Database GET {} -> EXPIRED", key);
            self.delete(key).await?;
            return Ok(None);
        }

        debug!("✓ Database GET {} -> HIT", key);
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: Vec<u8>, minutes: u64) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (key, value, expiration) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expiration = excluded.expiration",
            self.table
        );

        sqlx::query(&sql)
            .bind(self.prefixed(key))
            .bind(value)
            .bind(self.expiration(minutes))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("UPSERT", e))?;

        debug!("✓ Database SET {} (TTL: {} min)", key, minutes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE key = ?", self.table);
        sqlx::query(&sql)
            .bind(self.prefixed(key))
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("DELETE", e))?;

        debug!("✓ Database DELETE {}", key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let result = if self.prefix.is_empty() {
            sqlx::query(&format!("DELETE FROM {}", self.table))
                .execute(&self.pool)
                .await
        } else {
            // Exact, case-sensitive prefix match.
            let sql = format!(
                "DELETE FROM {} WHERE substr(key, 1, length(?1)) = ?1",
                self.table
            );
            sqlx::query(&sql)
                .bind(&self.prefix)
                .execute(&self.pool)
                .await
        };

        let removed = result.map_err(|e| db_error("CLEAR", e))?.rows_affected();
        warn!(
            "⚠ Database cache cleared {} rows under prefix '{}'",
            removed, self.prefix
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const NOW: u64 = 1_700_000_000;

    async fn open_pool() -> SqlitePool {
        let config = DatabaseConfig::default();
        pool_options(&config)
            .connect(&config.url)
            .await
            .expect("Failed to open sqlite")
    }

    async fn backend_on(pool: SqlitePool, prefix: &str, clock: ManualClock) -> DatabaseBackend {
        let config = DatabaseConfig {
            prefix: prefix.to_string(),
            ..Default::default()
        };
        DatabaseBackend::with_pool(pool, &config, clock)
            .await
            .expect("Failed to create backend")
    }

    async fn backend(prefix: &str) -> (DatabaseBackend, ManualClock) {
        let clock = ManualClock::new(NOW);
        let backend = backend_on(open_pool().await, prefix, clock.clone()).await;
        (backend, clock)
    }

    #[tokio::test]
    async fn test_set_get_and_expire() {
        let (backend, clock) = backend("").await;
        backend.set("foo", b"bar".to_vec(), 1).await.unwrap();
        assert_eq!(backend.get("foo").await.unwrap(), Some(b"bar".to_vec()));

        clock.advance(60);
        assert!(backend.get("foo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let (backend, _clock) = backend("").await;
        backend.set("foo", b"one".to_vec(), 0).await.unwrap();
        backend.set("foo", b"two".to_vec(), 0).await.unwrap();
        assert_eq!(backend.get("foo").await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_rows_are_prefixed() {
        let (backend, _clock) = backend("app_").await;
        backend.set("x", b"v".to_vec(), 0).await.unwrap();

        let keys: Vec<(String,)> = sqlx::query_as("SELECT key FROM cache")
            .fetch_all(&backend.pool)
            .await
            .unwrap();
        assert_eq!(keys, vec![("app_x".to_string(),)]);
    }

    #[tokio::test]
    async fn test_clear_scoped_to_prefix() {
        let (backend, _clock) = backend("app_").await;
        sqlx::query("INSERT INTO cache (key, value, expiration) VALUES ('appXother', x'00', ?)")
            .bind(FOREVER_TIMESTAMP)
            .execute(&backend.pool)
            .await
            .unwrap();
        backend.set("mine", b"v".to_vec(), 0).await.unwrap();

        backend.clear().await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache")
            .fetch_one(&backend.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(backend.get("mine").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_prefix_is_case_sensitive() {
        let pool = open_pool().await;
        let clock = ManualClock::new(NOW);
        let app = backend_on(pool.clone(), "app_", clock.clone()).await;
        let other = backend_on(pool, "APP_", clock).await;

        other.set("keep", b"1".to_vec(), 0).await.unwrap();
        app.set("drop", b"2".to_vec(), 0).await.unwrap();

        app.clear().await.unwrap();

        assert!(app.get("drop").await.unwrap().is_none());
        assert_eq!(other.get("keep").await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn test_clear_prefix_wildcards_are_literal() {
        let (backend, _clock) = backend("50%_").await;
        sqlx::query("INSERT INTO cache (key, value, expiration) VALUES ('50xyother', x'00', ?)")
            .bind(FOREVER_TIMESTAMP)
            .execute(&backend.pool)
            .await
            .unwrap();

        backend.clear().await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cache")
            .fetch_one(&backend.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_in_memory_pool_is_pinned() {
        let options = pool_options(&DatabaseConfig {
            pool_size: 4,
            ..Default::default()
        });
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        let on_disk = pool_options(&DatabaseConfig {
            url: "sqlite://cache.db?mode=rwc".to_string(),
            pool_size: 4,
            ..Default::default()
        });
        assert_eq!(on_disk.get_max_connections(), 4);
        assert_eq!(on_disk.get_min_connections(), 0);
        assert!(on_disk.get_idle_timeout().is_some());
    }

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table("cache_entries").is_ok());
        assert!(validate_table("cache; DROP TABLE users").is_err());
        assert!(validate_table("").is_err());
    }
}
