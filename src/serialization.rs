//! Versioned envelope around postcard payloads.
//!
//! Every value the store hands to a backend goes through [`encode`], and every
//! payload read back goes through [`decode`].
//!
//! # Format
//!
//! ```text
//! [MAGIC: 4 bytes] [VERSION: 4 bytes LE] [POSTCARD PAYLOAD]
//! ```
//!
//! The envelope is never empty, so a stored `None` or `()` stays
//! distinguishable from an absent key at the backend level.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic header identifying payloads written by this crate.
pub const CACHE_MAGIC: [u8; 4] = *b"CSTR";

/// Current envelope version. Bump when the payload layout changes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// Serialize a value into a versioned envelope.
///
/// # Errors
/// Returns `Error::SerializationError` if postcard cannot encode the value.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let payload = postcard::to_allocvec(value)
        .map_err(|e| Error::SerializationError(format!("postcard encode failed: {}", e)))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&CACHE_MAGIC);
    bytes.extend_from_slice(&CURRENT_SCHEMA_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Validate the envelope and deserialize the payload.
///
/// # Errors
///
/// - `Error::InvalidCacheEntry`: too short or bad magic
/// - `Error::VersionMismatch`: written by another envelope version
/// - `Error::DeserializationError`: payload does not decode into `T`
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::InvalidCacheEntry(format!(
            "entry too short: {} bytes",
            bytes.len()
        )));
    }

    if bytes[..4] != CACHE_MAGIC {
        return Err(Error::InvalidCacheEntry("bad magic header".to_string()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let found = u32::from_le_bytes(version);
    if found != CURRENT_SCHEMA_VERSION {
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found,
        });
    }

    postcard::from_bytes(&bytes[HEADER_LEN..])
        .map_err(|e| Error::DeserializationError(format!("postcard decode failed: {}", e)))
}
