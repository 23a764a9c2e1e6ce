//! Redis cache backend implementation.

use super::service::{ServiceBackend, ServiceClient};
use crate::error::{Error, Result};
use deadpool_redis::redis::{self, AsyncCommands};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};

/// Default Redis connection pool size.
/// Override with REDIS_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: usize = 16;

/// Keys requested per SCAN round trip when clearing a prefix.
const SCAN_BATCH: usize = 500;

/// Configuration for Redis backend.
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String, // e.g., "redis://localhost:6379/0"
    pub pool_size: usize,
    pub prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig {
            url: "redis://127.0.0.1:6379".to_string(),
            pool_size: DEFAULT_POOL_SIZE,
            prefix: String::new(),
        }
    }
}

/// Pooled Redis client.
#[derive(Clone)]
pub struct RedisClient {
    pool: Pool,
}

/// Prefixed cache backend over Redis.
pub type RedisBackend = ServiceBackend<RedisClient>;

impl RedisClient {
    /// Create a pooled client from configuration.
    ///
    /// # Errors
    /// Returns `Err` if the URL is invalid or pool creation fails
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let mut cfg = Config::from_url(config.url.clone());
        cfg.pool = Some(PoolConfig::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| Error::ConfigError(format!("Failed to create Redis pool: {}", e)))?;

        info!(
            "✓ Redis backend initialized at {} (pool size: {})",
            config.url, config.pool_size
        );

        Ok(RedisClient { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| Error::BackendError(format!("Failed to get Redis connection: {}", e)))
    }
}

impl ServiceBackend<RedisClient> {
    /// Build a prefixed Redis backend from configuration.
    pub fn from_config(config: &RedisConfig) -> Result<Self> {
        Ok(ServiceBackend::new(
            RedisClient::new(config)?,
            config.prefix.clone(),
        ))
    }

    /// Create from a URL directly.
    ///
    /// Pool size comes from `REDIS_POOL_SIZE` when set.
    pub fn from_url(url: impl Into<String>, prefix: impl Into<String>) -> Result<Self> {
        let pool_size = std::env::var("REDIS_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        Self::from_config(&RedisConfig {
            url: url.into(),
            pool_size,
            prefix: prefix.into(),
        })
    }
}

/// SCAN `MATCH` pattern selecting every key under `prefix`.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

fn backend_error(op: &str, key: &str, e: redis::RedisError) -> Error {
    Error::BackendError(format!("Redis {} failed for key {}: {}", op, key, e))
}

impl ServiceClient for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| backend_error("GET", key, e))?;

        if value.is_some() {
            debug!("✓ Redis GET {} -> HIT", key);
        } else {
            debug!("✓ Redis GET {} -> MISS", key);
        }
        Ok(value)
    }

    async fn put(&self, key: &str, value: &[u8], seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;

        if seconds > 0 {
            let _: () = conn
                .set_ex(key, value, seconds)
                .await
                .map_err(|e| backend_error("SETEX", key, e))?;
        } else {
            let _: () = conn
                .set(key, value)
                .await
                .map_err(|e| backend_error("SET", key, e))?;
        }

        debug!("✓ Redis SET {} (TTL: {}s)", key, seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        let _: () = conn
            .del(key)
            .await
            .map_err(|e| backend_error("DEL", key, e))?;

        debug!("✓ Redis DELETE {}", key);
        Ok(())
    }

    async fn flush(&self, prefix: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        if prefix.is_empty() {
            let _: () = redis::cmd("FLUSHDB")
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::BackendError(format!("Redis FLUSHDB failed: {}", e)))?;
            warn!("⚠ Redis FLUSHDB executed - all cache cleared!");
            return Ok(());
        }

        let pattern = match_pattern(prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0usize;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::BackendError(format!("Redis SCAN failed: {}", e)))?;

            if !keys.is_empty() {
                removed += keys.len();
                let _: () = conn
                    .del(keys)
                    .await
                    .map_err(|e| Error::BackendError(format!("Redis DEL failed: {}", e)))?;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        warn!("⚠ Redis cleared {} keys under prefix '{}'", removed, prefix);
        Ok(())
    }
}
