//! Error types for cache store operations.
//!
//! A cache miss is never an error. Every lookup returns `Result<Option<_>>`
//! and `Err` is reserved for faults: an unreachable backend, a value that
//! cannot cross the serialization boundary, or bad configuration.

use thiserror::Error;

/// Unified error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Backend unavailable or transport failure.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Driver name not recognised (or its feature is not compiled in).
    #[error("Unknown cache driver: {0}")]
    UnknownDriver(String),

    /// Value could not be encoded for storage.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Stored payload could not be decoded into the requested type.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Envelope or on-disk header is malformed.
    #[error("Invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// Payload was written by an incompatible envelope version.
    #[error("Cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    /// Memoization lookup for a key that was never resolved.
    #[error("Key not present in memory: {0}")]
    NotInMemory(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;
