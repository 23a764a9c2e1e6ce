//! In-process cache backend (the "array" driver).

use super::{ttl_seconds, CacheBackend};
use crate::error::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

/// Thread-safe in-memory backend.
///
/// Clones share the same map. Expired entries are dropped lazily on read;
/// there is no background sweeper.
///
/// # Example
///
/// ```
/// # use cache_store::backend::{CacheBackend, InMemoryBackend};
/// # async fn example() -> cache_store::Result<()> {
/// let backend = InMemoryBackend::new();
/// backend.set("key", b"value".to_vec(), 10).await?;
/// assert_eq!(backend.get("key").await?, Some(b"value".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<DashMap<String, Entry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entries.get(key) {
            None => {
                debug!("✓ InMemory GET {} -> MISS", key);
                return Ok(None);
            }
            Some(entry) if !entry.is_expired() => {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => {}
        }

        // Shard guard released above; safe to take the write lock.
        self.entries.remove_if(key, |_, entry| entry.is_expired());
        debug!("✓ InMemory GET {} -> EXPIRED", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, minutes: u64) -> Result<()> {
        let expires_at = match minutes {
            0 => None,
            m => Instant::now().checked_add(Duration::from_secs(ttl_seconds(m))),
        };

        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        debug!("✓ InMemory SET {} (TTL: {} min)", key, minutes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        debug!("✓ InMemory CLEAR");
        Ok(())
    }
}
