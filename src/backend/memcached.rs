//! Memcached cache backend implementation.

use super::service::{ServiceBackend, ServiceClient};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use async_memcached::AsciiProtocol;
use deadpool_memcached::{Manager, Pool};
use std::time::Duration;

/// Default Memcached connection pool size.
/// Formula: (CPU cores × 2) + 1
/// Override with MEMCACHED_POOL_SIZE environment variable
const DEFAULT_POOL_SIZE: u32 = 16;

/// Relative TTLs above 30 days are read by memcached as absolute timestamps.
const MAX_RELATIVE_EXPIRATION: u64 = 60 * 60 * 24 * 30;

/// Configuration for Memcached backend.
#[derive(Clone, Debug)]
pub struct MemcachedConfig {
    pub servers: Vec<String>, // e.g., ["localhost:11211", "cache2:11211"]
    pub connection_timeout: Duration,
    pub pool_size: u32,
    pub prefix: String,
}

impl Default for MemcachedConfig {
    fn default() -> Self {
        MemcachedConfig {
            servers: vec!["localhost:11211".to_string()],
            connection_timeout: Duration::from_secs(5),
            pool_size: 10,
            prefix: String::new(),
        }
    }
}

/// Pooled Memcached client.
#[derive(Clone)]
pub struct MemcachedClient {
    pool: Pool,
}

/// Prefixed cache backend over Memcached.
pub type MemcachedBackend = ServiceBackend<MemcachedClient>;

impl MemcachedClient {
    /// Create a pooled client from configuration.
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub fn new(config: &MemcachedConfig) -> Result<Self> {
        // deadpool-memcached Manager takes a single server address
        let addr = config
            .servers
            .first()
            .ok_or_else(|| Error::ConfigError("No memcached servers specified".to_string()))?
            .clone();

        let pool = Pool::builder(Manager::new(addr.clone()))
            .max_size(config.pool_size as usize)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to create connection pool: {}", e)))?;

        info!(
            "✓ Memcached backend initialized with server: {} (pool size: {})",
            addr, config.pool_size
        );

        Ok(MemcachedClient { pool })
    }

    async fn connection(&self) -> Result<deadpool_memcached::Object> {
        self.pool.get().await.map_err(|e| {
            Error::BackendError(format!("Failed to get Memcached connection: {}", e))
        })
    }
}

impl ServiceBackend<MemcachedClient> {
    /// Build a prefixed Memcached backend from configuration.
    ///
    /// # Errors
    /// Returns `Err` if connection pool creation fails
    pub fn from_config(config: &MemcachedConfig) -> Result<Self> {
        Ok(ServiceBackend::new(
            MemcachedClient::new(config)?,
            config.prefix.clone(),
        ))
    }

    /// Create from server address directly.
    ///
    /// Pool size comes from `MEMCACHED_POOL_SIZE` when set.
    pub fn from_server(addr: String, prefix: impl Into<String>) -> Result<Self> {
        let pool_size = std::env::var("MEMCACHED_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_POOL_SIZE);

        Self::from_config(&MemcachedConfig {
            servers: vec![addr],
            pool_size,
            prefix: prefix.into(),
            ..Default::default()
        })
    }
}

/// Memcached `exptime` for a TTL in seconds (`None` = never expires).
fn expiration(seconds: u64, now: u64) -> Option<i64> {
    match seconds {
        0 => None,
        s if s <= MAX_RELATIVE_EXPIRATION => Some(s as i64),
        s => Some(now.saturating_add(s).min(i64::MAX as u64) as i64),
    }
}

impl ServiceClient for MemcachedClient {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;

        match conn.get(key).await {
            Ok(Some(value)) => {
                debug!("✓ Memcached GET {} -> HIT", key);
                Ok(value.data)
            }
            Ok(None) => {
                debug!("✓ Memcached GET {} -> MISS", key);
                Ok(None)
            }
            Err(e) => Err(Error::BackendError(format!(
                "Memcached GET failed for key {}: {}",
                key, e
            ))),
        }
    }

    async fn put(&self, key: &str, value: &[u8], seconds: u64) -> Result<()> {
        let mut conn = self.connection().await?;

        let exptime = expiration(seconds, SystemClock.now());

        // Correct parameter order: set(key, value, ttl, flags)
        conn.set(key, value, exptime, None).await.map_err(|e| {
            Error::BackendError(format!("Memcached SET failed for key {}: {}", key, e))
        })?;

        debug!("✓ Memcached SET {} (TTL: {}s)", key, seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        match conn.delete(key).await {
            Ok(()) => {}
            // Deleting an absent key is not a failure at this layer
            Err(e) if e.to_string().contains("not found") => {}
            Err(e) => {
                return Err(Error::BackendError(format!(
                    "Memcached DELETE failed for key {}: {}",
                    key, e
                )))
            }
        }

        debug!("✓ Memcached DELETE {}", key);
        Ok(())
    }

    async fn flush(&self, prefix: &str) -> Result<()> {
        let mut conn = self.connection().await?;

        conn.flush_all()
            .await
            .map_err(|e| Error::BackendError(format!("Memcached FLUSH_ALL failed: {}", e)))?;

        // Memcached cannot enumerate keys, so the prefix cannot scope the flush.
        warn!(
            "⚠ Memcached FLUSH_ALL executed for prefix '{}' - all cache cleared!",
            prefix
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memcached_config_default() {
        let config = MemcachedConfig::default();
        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.servers[0], "localhost:11211");
        assert_eq!(config.pool_size, 10);
        assert!(config.prefix.is_empty());
    }

    #[test]
    fn test_memcached_requires_a_server() {
        let config = MemcachedConfig {
            servers: Vec::new(),
            ..Default::default()
        };

        assert!(matches!(
            MemcachedClient::new(&config),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_expiration_relative_and_absolute() {
        let now = 1_700_000_000;
        assert_eq!(expiration(0, now), None);
        assert_eq!(expiration(60, now), Some(60));
        assert_eq!(
            expiration(MAX_RELATIVE_EXPIRATION, now),
            Some(MAX_RELATIVE_EXPIRATION as i64)
        );
        assert_eq!(
            expiration(MAX_RELATIVE_EXPIRATION + 60, now),
            Some((now + MAX_RELATIVE_EXPIRATION + 60) as i64)
        );
    }
}
