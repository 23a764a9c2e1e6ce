//! # cache-store
//!
//! A unified cache contract over interchangeable backing stores.
//!
//! ## Features
//!
//! - **One API, many backends:** in-memory, filesystem, Memcached, Redis and SQL
//! - **Per-instance memoization:** repeated reads of a key cost one round trip
//! - **Lazy defaults:** fall back to a value or a closure on miss
//! - **Remember:** compute-and-store on miss, with sync or async producers
//! - **Typed values:** anything `Serialize + Deserialize`, stored in a versioned envelope
//! - **Explicit wiring:** build a store from [`config::CacheConfig`] with [`factory::build`]
//!
//! ## Quick Start
//!
//! ```
//! use cache_store::{backend::InMemoryBackend, Store};
//!
//! # async fn example() -> cache_store::Result<()> {
//! let mut store = Store::new(InMemoryBackend::new());
//!
//! // Miss: the closure runs once and its result is stored for 10 minutes
//! let total: u64 = store.remember("report:total", 10, || 1_234).await?;
//!
//! // Hit: served from memory, no backend round trip
//! assert_eq!(store.get::<u64>("report:total").await?, Some(total));
//!
//! store.forget("report:total").await?;
//! assert!(!store.has("report:total").await?);
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod factory;
pub mod serialization;
pub mod store;

// Re-exports for convenience
pub use backend::CacheBackend;
pub use config::{CacheConfig, Driver};
pub use error::{Error, Result};
pub use factory::AnyBackend;
pub use store::{Fallback, Store};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
