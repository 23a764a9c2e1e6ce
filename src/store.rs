//! Cache store - memoizing front end over a backend.

use crate::backend::{CacheBackend, FOREVER};
use crate::error::{Error, Result};
use crate::serialization::{decode, encode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;

/// Default TTL in minutes for a new store.
pub const DEFAULT_CACHE_MINUTES: u64 = 60;

/// Value returned when a key misses.
///
/// `Lazy` runs only on a miss, and its result is not memoized.
pub enum Fallback<T> {
    Value(T),
    Lazy(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Fallback<T> {
    pub fn lazy(f: impl FnOnce() -> T + Send + 'static) -> Self {
        Fallback::Lazy(Box::new(f))
    }

    fn resolve(self) -> T {
        match self {
            Fallback::Value(value) => value,
            Fallback::Lazy(f) => f(),
        }
    }
}

impl<T> From<T> for Fallback<T> {
    fn from(value: T) -> Self {
        Fallback::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Fallback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallback::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Fallback::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Cache store over a single backend.
///
/// Every value this store has read or written is kept in a per-instance
/// memoization map, so repeated reads of a key cost one backend round trip
/// at most. The map has no expiration of its own: it is invalidated per key
/// by [`Store::forget`] and entirely by [`Store::flush`].
///
/// A store is meant for a single logical owner (one request, one task) and
/// takes `&mut self` for every operation. Share the backend, not the store.
///
/// # Example
///
/// ```
/// use cache_store::{backend::InMemoryBackend, Store};
///
/// # async fn example() -> cache_store::Result<()> {
/// let mut store = Store::new(InMemoryBackend::new());
///
/// store.put("user:1", &"Ada".to_string(), 10).await?;
/// let name: Option<String> = store.get("user:1").await?;
/// assert_eq!(name.as_deref(), Some("Ada"));
/// # Ok(())
/// # }
/// ```
pub struct Store<B: CacheBackend> {
    backend: B,
    memory: HashMap<String, Vec<u8>>,
    default_minutes: u64,
}

impl<B: CacheBackend> Store<B> {
    /// Create a store over `backend` with an empty memoization map.
    pub fn new(backend: B) -> Self {
        Store {
            backend,
            memory: HashMap::new(),
            default_minutes: DEFAULT_CACHE_MINUTES,
        }
    }

    /// Resolve `key` to its raw payload, memoizing backend hits.
    async fn resolve(&mut self, key: &str) -> Result<Option<&[u8]>> {
        if !self.memory.contains_key(key) {
            match self.backend.get(key).await? {
                Some(bytes) => {
                    self.memory.insert(key.to_string(), bytes);
                }
                None => return Ok(None),
            }
        }

        Ok(self.memory.get(key).map(Vec::as_slice))
    }

    /// Determine if an item exists in the cache.
    pub async fn has(&mut self, key: &str) -> Result<bool> {
        Ok(self.resolve(key).await?.is_some())
    }

    /// Retrieve an item, `None` on miss.
    ///
    /// # Errors
    ///
    /// - `Error::BackendError`: backend unavailable
    /// - `Error::DeserializationError`: stored payload is not a `T`
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.resolve(key).await? {
            Some(bytes) => decode(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Retrieve an item or resolve `default` on miss.
    ///
    /// ```
    /// # use cache_store::{backend::InMemoryBackend, Fallback, Store};
    /// # async fn example() -> cache_store::Result<()> {
    /// let mut store = Store::new(InMemoryBackend::new());
    /// let hits: u32 = store.get_or("hits", 0u32).await?;
    /// let name: String = store.get_or("name", Fallback::lazy(|| "guest".to_string())).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_or<T: DeserializeOwned>(
        &mut self,
        key: &str,
        default: impl Into<Fallback<T>>,
    ) -> Result<T> {
        match self.get(key).await? {
            Some(value) => Ok(value),
            None => Ok(default.into().resolve()),
        }
    }

    /// Retrieve an item or compute a default lazily on miss.
    pub async fn get_or_else<T, F>(&mut self, key: &str, default: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.get(key).await? {
            Some(value) => Ok(value),
            None => Ok(default()),
        }
    }

    /// Store an item for `minutes` minutes (`0` = forever).
    ///
    /// The memoization map is updated before the backend write, so this
    /// store observes its own write even if the backend call fails.
    pub async fn put<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        minutes: u64,
    ) -> Result<()> {
        let bytes = encode(value)?;
        self.memory.insert(key.to_string(), bytes.clone());
        self.backend.set(key, bytes, minutes).await
    }

    /// Store an item with no expiration.
    pub async fn forever<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        self.put(key, value, FOREVER).await
    }

    /// Store an item for the store's default cache time.
    pub async fn insert<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let minutes = self.default_minutes;
        self.put(key, value, minutes).await
    }

    /// Get an item, or produce, store and return it.
    ///
    /// `producer` runs at most once per call and only on a miss. Nothing
    /// coordinates concurrent stores racing on the same key.
    pub async fn remember<T, F>(&mut self, key: &str, minutes: u64, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let value = producer();
        self.put(key, &value, minutes).await?;
        Ok(value)
    }

    /// [`Store::remember`] with no expiration.
    pub async fn remember_forever<T, F>(&mut self, key: &str, producer: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        self.remember(key, FOREVER, producer).await
    }

    /// [`Store::remember`] with a fallible async producer, e.g. a database
    /// query. A producer error is returned as-is and nothing is stored.
    pub async fn remember_async<T, F, Fut>(
        &mut self,
        key: &str,
        minutes: u64,
        producer: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get(key).await? {
            return Ok(value);
        }

        let value = producer().await?;
        self.put(key, &value, minutes).await?;
        Ok(value)
    }

    /// Remove an item from memory and from the backend.
    pub async fn forget(&mut self, key: &str) -> Result<()> {
        self.memory.remove(key);
        self.backend.delete(key).await
    }

    /// Remove all items from memory and from the backend.
    pub async fn flush(&mut self) -> Result<()> {
        self.memory.clear();
        self.backend.clear().await
    }

    /// Default cache time in minutes.
    pub fn default_cache_time(&self) -> u64 {
        self.default_minutes
    }

    /// Set the default cache time in minutes. Only [`Store::insert`] reads it.
    pub fn set_default_cache_time(&mut self, minutes: u64) {
        self.default_minutes = minutes;
    }

    /// Determine if an item is in memory.
    pub fn exists_in_memory(&self, key: &str) -> bool {
        self.memory.contains_key(key)
    }

    /// Get the value of an item in memory.
    ///
    /// # Errors
    /// Returns `Error::NotInMemory` if the key was never resolved by this store.
    pub fn get_from_memory<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let bytes = self
            .memory
            .get(key)
            .ok_or_else(|| Error::NotInMemory(key.to_string()))?;
        decode(bytes)
    }

    /// Set the value of an item in memory without touching the backend.
    pub fn set_in_memory<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let bytes = encode(value)?;
        self.memory.insert(key.to_string(), bytes);
        Ok(())
    }

    /// Keys currently held in memory.
    pub fn memory_keys(&self) -> impl Iterator<Item = &str> {
        self.memory.keys().map(String::as_str)
    }

    /// Get backend reference (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get mutable backend reference (for advanced use).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}
