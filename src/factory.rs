//! Explicit construction of stores from configuration.
//!
//! [`build`] maps a [`CacheConfig`] to a ready [`Store`]. Applications call it
//! once and pass the store (or its backend) to the code that needs it.

use crate::backend::CacheBackend;
use crate::config::{CacheConfig, Driver};
use crate::error::{Error, Result};
use crate::store::Store;

#[cfg(feature = "database")]
use crate::backend::{DatabaseBackend, DatabaseConfig};
#[cfg(feature = "file")]
use crate::backend::FileBackend;
#[cfg(feature = "inmemory")]
use crate::backend::InMemoryBackend;
#[cfg(feature = "memcached")]
use crate::backend::{MemcachedBackend, MemcachedConfig};
#[cfg(feature = "redis")]
use crate::backend::{RedisBackend, RedisConfig};

/// Any backend compiled into this build, selected at runtime.
#[derive(Clone)]
pub enum AnyBackend {
    #[cfg(feature = "inmemory")]
    InMemory(InMemoryBackend),
    #[cfg(feature = "file")]
    File(FileBackend),
    #[cfg(feature = "memcached")]
    Memcached(MemcachedBackend),
    #[cfg(feature = "redis")]
    Redis(RedisBackend),
    #[cfg(feature = "database")]
    Database(DatabaseBackend),
}

impl AnyBackend {
    /// Driver this backend was built for.
    pub fn driver(&self) -> Driver {
        match self {
            #[cfg(feature = "inmemory")]
            AnyBackend::InMemory(_) => Driver::InMemory,
            #[cfg(feature = "file")]
            AnyBackend::File(_) => Driver::File,
            #[cfg(feature = "memcached")]
            AnyBackend::Memcached(_) => Driver::Memcached,
            #[cfg(feature = "redis")]
            AnyBackend::Redis(_) => Driver::Redis,
            #[cfg(feature = "database")]
            AnyBackend::Database(_) => Driver::Database,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            #[cfg(feature = "inmemory")]
            AnyBackend::InMemory($backend) => $call,
            #[cfg(feature = "file")]
            AnyBackend::File($backend) => $call,
            #[cfg(feature = "memcached")]
            AnyBackend::Memcached($backend) => $call,
            #[cfg(feature = "redis")]
            AnyBackend::Redis($backend) => $call,
            #[cfg(feature = "database")]
            AnyBackend::Database($backend) => $call,
        }
    };
}

impl CacheBackend for AnyBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        dispatch!(self, backend => backend.get(key).await)
    }

    async fn set(&self, key: &str, value: Vec<u8>, minutes: u64) -> Result<()> {
        dispatch!(self, backend => backend.set(key, value, minutes).await)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        dispatch!(self, backend => backend.delete(key).await)
    }

    async fn clear(&self) -> Result<()> {
        dispatch!(self, backend => backend.clear().await)
    }
}

/// Construct the backend named by `config.driver`.
///
/// # Errors
///
/// - `Error::UnknownDriver`: the driver's feature is not compiled in
/// - `Error::ConfigError` / `Error::BackendError`: the backend could not be
///   created; no partial store is returned
pub async fn build_backend(config: &CacheConfig) -> Result<AnyBackend> {
    let backend = match config.driver {
        #[cfg(feature = "inmemory")]
        Driver::InMemory => AnyBackend::InMemory(InMemoryBackend::new()),
        #[cfg(feature = "file")]
        Driver::File => AnyBackend::File(FileBackend::new(config.path.clone())),
        #[cfg(feature = "memcached")]
        Driver::Memcached => AnyBackend::Memcached(MemcachedBackend::from_config(
            &MemcachedConfig {
                servers: config.memcached_servers.clone(),
                pool_size: config.memcached_pool_size,
                prefix: config.prefix.clone(),
                ..Default::default()
            },
        )?),
        #[cfg(feature = "redis")]
        Driver::Redis => AnyBackend::Redis(RedisBackend::from_config(&RedisConfig {
            url: config.redis_url.clone(),
            pool_size: config.redis_pool_size,
            prefix: config.prefix.clone(),
        })?),
        #[cfg(feature = "database")]
        Driver::Database => AnyBackend::Database(
            DatabaseBackend::connect(&DatabaseConfig {
                url: config.database_url.clone(),
                table: config.database_table.clone(),
                prefix: config.prefix.clone(),
                ..Default::default()
            })
            .await?,
        ),
        #[allow(unreachable_patterns)]
        other => {
            return Err(Error::UnknownDriver(format!(
                "{} (feature not enabled)",
                other
            )))
        }
    };

    info!("✓ Cache driver '{}' ready", backend.driver());
    Ok(backend)
}

/// Construct a store for `config`, with its default TTL applied.
///
/// # Example
///
/// ```
/// # use cache_store::{config::CacheConfig, factory};
/// # async fn example() -> cache_store::Result<()> {
/// let config = CacheConfig::from_json(r#"{"driver": "array", "default_minutes": 5}"#)?;
/// let mut store = factory::build(&config).await?;
/// store.insert("greeting", "hello").await?;
/// # Ok(())
/// # }
/// ```
pub async fn build(config: &CacheConfig) -> Result<Store<AnyBackend>> {
    let mut store = Store::new(build_backend(config).await?);
    store.set_default_cache_time(config.default_minutes);
    Ok(store)
}
