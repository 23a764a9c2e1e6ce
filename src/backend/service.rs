//! Adapter for shared external key/value services.
//!
//! Distributed caches are reached through a narrow [`ServiceClient`]. The
//! [`ServiceBackend`] wrapping it owns the parts every such store shares:
//! namespace prefixing, minute-to-second TTL conversion and mapping the
//! client's "not found" onto a cache miss.

use super::{ttl_seconds, CacheBackend};
use crate::error::Result;
use std::future::Future;

/// Raw operations of an external cache client.
///
/// Keys arrive fully prefixed. `seconds == 0` means no expiration.
/// Connection management, timeouts and retries belong to the client.
pub trait ServiceClient: Send + Sync {
    /// Fetch a value. A client-level "not found" (or failure sentinel) must be
    /// returned as `Ok(None)`, never as a stored value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    fn put(&self, key: &str, value: &[u8], seconds: u64) -> impl Future<Output = Result<()>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove every key starting with `prefix`. Clients that cannot scope a
    /// flush may clear everything.
    fn flush(&self, prefix: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Prefixed backend over any [`ServiceClient`].
///
/// Caller-visible keys never include the prefix; it is prepended on every
/// call and nothing is stripped on read.
#[derive(Clone)]
pub struct ServiceBackend<C> {
    client: C,
    prefix: String,
}

impl<C: ServiceClient> ServiceBackend<C> {
    pub fn new(client: C, prefix: impl Into<String>) -> Self {
        ServiceBackend {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Backend address for a caller-visible key.
    pub fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

impl<C: ServiceClient> CacheBackend for ServiceBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.client.get(&self.prefixed(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, minutes: u64) -> Result<()> {
        self.client
            .put(&self.prefixed(key), &value, ttl_seconds(minutes))
            .await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.delete(&self.prefixed(key)).await
    }

    async fn clear(&self) -> Result<()> {
        self.client.flush(&self.prefix).await
    }
}
