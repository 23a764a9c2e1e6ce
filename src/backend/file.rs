//! Filesystem cache backend.
//!
//! One file per key at `directory/key`. Each file holds a 10-digit ASCII
//! Unix expiration timestamp followed by the opaque payload:
//!
//! ```text
//! 1735689600<payload bytes>
//! ```
//!
//! Entries that never expire carry [`FOREVER_TIMESTAMP`]. Expired files are
//! deleted when read; nothing sweeps the directory in the background.
//! Keys are used as relative paths verbatim, so callers must supply
//! filesystem-safe keys. Concurrent writers to the same key are not
//! coordinated.

use super::{ttl_seconds, CacheBackend};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Width of the expiration header in bytes.
pub const EXPIRATION_WIDTH: usize = 10;

/// Largest 10-digit timestamp, used as the "never expires" marker.
pub const FOREVER_TIMESTAMP: u64 = 9_999_999_999;

/// File-per-key backend rooted at a directory.
///
/// # Example
///
/// ```no_run
/// # use cache_store::backend::{CacheBackend, FileBackend};
/// # async fn example() -> cache_store::Result<()> {
/// let backend = FileBackend::new("/var/cache/app");
/// backend.set("greeting", b"hello".to_vec(), 5).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileBackend {
    directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileBackend {
    /// Create a backend rooted at `directory`. No I/O happens here; the
    /// directory is created on first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_clock(directory, SystemClock)
    }

    /// Create a backend with an explicit time source.
    pub fn with_clock(directory: impl Into<PathBuf>, clock: impl Clock) -> Self {
        let directory = directory.into();
        info!("✓ File backend initialized at {}", directory.display());
        FileBackend {
            directory,
            clock: Arc::new(clock),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path for the given cache key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }

    /// Absolute expiration timestamp for a TTL in minutes.
    fn expiration(&self, minutes: u64) -> u64 {
        if minutes == 0 {
            return FOREVER_TIMESTAMP;
        }

        self.clock
            .now()
            .saturating_add(ttl_seconds(minutes))
            .min(FOREVER_TIMESTAMP)
    }

    async fn remove_path(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Split a file's contents into its expiration header and payload.
fn parse_entry(contents: &[u8]) -> Option<(u64, &[u8])> {
    if contents.len() < EXPIRATION_WIDTH {
        return None;
    }

    let (header, payload) = contents.split_at(EXPIRATION_WIDTH);
    if !header.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let expiration = std::str::from_utf8(header).ok()?.parse().ok()?;
    Some((expiration, payload))
}

impl CacheBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);

        let contents = match fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("✓ File GET {} -> MISS", key);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some((expiration, payload)) = parse_entry(&contents) else {
            warn!("⚠ File entry {} has a corrupt header, removing", key);
            self.remove_path(&path).await?;
            return Ok(None);
        };

        if self.clock.now() >= expiration {
            debug!("✓ File GET {} -> EXPIRED", key);
            self.remove_path(&path).await?;
            return Ok(None);
        }

        debug!("✓ File GET {} -> HIT", key);
        Ok(Some(payload.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, minutes: u64) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut contents = Vec::with_capacity(EXPIRATION_WIDTH + value.len());
        contents.extend_from_slice(format!("{:010}", self.expiration(minutes)).as_bytes());
        contents.extend_from_slice(&value);

        fs::write(&path, contents).await?;
        debug!("✓ File SET {} (TTL: {} min)", key, minutes);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.remove_path(&self.path(key)).await?;
        debug!("✓ File DELETE {}", key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Empty the directory but keep it in place.
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(entry.path()).await?;
            } else {
                self.remove_path(&entry.path()).await?;
            }
        }

        warn!("⚠ File cache at {} cleared", self.directory.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const NOW: u64 = 1_700_000_000;

    fn backend() -> (tempfile::TempDir, FileBackend, ManualClock) {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let clock = ManualClock::new(NOW);
        let backend = FileBackend::with_clock(dir.path(), clock.clone());
        (dir, backend, clock)
    }

    #[tokio::test]
    async fn test_file_layout() {
        let (_dir, backend, _clock) = backend();
        backend.set("foo", b"bar".to_vec(), 2).await.unwrap();

        let raw = std::fs::read(backend.path("foo")).unwrap();
        assert_eq!(&raw[..10], (NOW + 120).to_string().as_bytes());
        assert_eq!(&raw[10..], b"bar");
    }

    #[tokio::test]
    async fn test_forever_uses_sentinel() {
        let (_dir, backend, _clock) = backend();
        backend.set("foo", b"bar".to_vec(), 0).await.unwrap();

        let raw = std::fs::read(backend.path("foo")).unwrap();
        assert_eq!(&raw[..10], b"9999999999");
    }

    #[tokio::test]
    async fn test_get_before_and_after_expiry() {
        let (_dir, backend, clock) = backend();
        backend.set("foo", b"bar".to_vec(), 1).await.unwrap();

        clock.advance(59);
        assert_eq!(backend.get("foo").await.unwrap(), Some(b"bar".to_vec()));

        clock.advance(1);
        assert!(backend.get("foo").await.unwrap().is_none());
        assert!(!backend.path("foo").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_miss() {
        let (_dir, backend, _clock) = backend();
        assert!(backend.get("nothing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_header_is_miss() {
        let (_dir, backend, _clock) = backend();
        std::fs::write(backend.path("junk"), b"12ab").unwrap();

        assert!(backend.get("junk").await.unwrap().is_none());
        assert!(!backend.path("junk").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_ok() {
        let (_dir, backend, _clock) = backend();
        backend.delete("ghost").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_keeps_directory() {
        let (dir, backend, _clock) = backend();
        backend.set("a", b"1".to_vec(), 0).await.unwrap();
        backend.set("nested/b", b"2".to_vec(), 0).await.unwrap();

        backend.clear().await.unwrap();

        assert!(dir.path().exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_clear_on_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("never-created"));
        backend.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache").join("store");
        let backend = FileBackend::with_clock(&root, ManualClock::new(NOW));
        assert!(!root.exists());
        assert!(backend.get("foo").await.unwrap().is_none());

        backend.set("foo", b"bar".to_vec(), 0).await.unwrap();
        backend.set("nested/baz", b"qux".to_vec(), 0).await.unwrap();

        assert!(root.is_dir());
        assert_eq!(backend.get("foo").await.unwrap(), Some(b"bar".to_vec()));
        assert_eq!(
            backend.get("nested/baz").await.unwrap(),
            Some(b"qux".to_vec())
        );
    }

    #[test]
    fn test_expiration_clamped_to_sentinel() {
        let clock = ManualClock::new(FOREVER_TIMESTAMP - 10);
        let backend = FileBackend::with_clock("/tmp/unused", clock);
        assert_eq!(backend.expiration(5), FOREVER_TIMESTAMP);
        assert_eq!(backend.expiration(0), FOREVER_TIMESTAMP);
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry(b"0000000042rest"), Some((42, &b"rest"[..])));
        assert_eq!(parse_entry(b"0000000042"), Some((42, &b""[..])));
        assert!(parse_entry(b"short").is_none());
        assert!(parse_entry(b"00000-0042x").is_none());
    }
}
