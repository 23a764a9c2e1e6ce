//! Cache backend contract and implementations.
//!
//! A backend only translates four primitives into its native calls:
//! `get`, `set`, `delete` and `clear`. Memoization, default values and
//! serialization live in [`crate::store::Store`].
//!
//! TTLs are expressed in whole minutes. `0` means "never expires", not
//! "expire immediately".

use crate::error::Result;
use std::future::Future;

#[cfg(feature = "database")]
pub mod database;
#[cfg(feature = "file")]
pub mod file;
#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "memcached")]
pub mod memcached;
#[cfg(feature = "redis")]
pub mod redis;
pub mod service;

#[cfg(feature = "database")]
pub use database::{DatabaseBackend, DatabaseConfig};
#[cfg(feature = "file")]
pub use file::FileBackend;
#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryBackend;
#[cfg(feature = "memcached")]
pub use memcached::{MemcachedBackend, MemcachedClient, MemcachedConfig};
#[cfg(feature = "redis")]
pub use redis::{RedisBackend, RedisClient, RedisConfig};
pub use service::{ServiceBackend, ServiceClient};

/// TTL value meaning "store with no expiration".
pub const FOREVER: u64 = 0;

/// Convert a TTL in minutes to seconds, saturating on overflow.
pub fn ttl_seconds(minutes: u64) -> u64 {
    minutes.saturating_mul(60)
}

/// Capability interface every backing store implements.
///
/// Implementations use interior mutability (maps, pools, files) so a
/// backend can be shared behind `&self`.
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw payload stored under `key`, `None` on miss or expiry.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Store a payload for `minutes` minutes (`0` = forever).
    fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        minutes: u64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove every key this backend manages, scoped to its prefix if any.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_seconds() {
        assert_eq!(ttl_seconds(FOREVER), 0);
        assert_eq!(ttl_seconds(1), 60);
        assert_eq!(ttl_seconds(90), 5400);
        assert_eq!(ttl_seconds(u64::MAX), u64::MAX);
    }
}
