//! File Backend Module
//!
//! Stores one JSON file per entry under a root directory. File locations are
//! derived from the SHA-256 digest of the key and sharded over two directory
//! levels so no single directory grows unbounded:
//!
//! ```text
//! <root>/ab/12/ab12cd...   (64 hex chars)
//! ```
//!
//! Reads never fail on I/O or decoding problems; those are misses. Writes
//! are plain `fs::write` calls, not fsynced and not atomic across processes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::expiry::{current_timestamp, is_expired, Ttl};
use crate::cache::{validate_key, Backend};
use crate::error::Result;

// == File Backend ==
#[derive(Debug, Clone)]
pub struct FileBackend {
    /// Root directory holding the shard directories
    root: PathBuf,
    /// Unix mode applied to created directories and entry files
    permissions: Option<u32>,
}

impl FileBackend {
    // == Constructor ==
    /// Creates a backend rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>, permissions: Option<u32>) -> Self {
        Self {
            root: root.into(),
            permissions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // == Entry Path ==
    /// Computes the sharded location of `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));

        self.root
            .join(&digest[0..2])
            .join(&digest[2..4])
            .join(&digest)
    }

    fn read_entry(&self, path: &Path) -> Option<CacheEntry> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cache file");
                return None;
            }
        };

        match CacheEntry::from_bytes(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "malformed cache file treated as miss");
                None
            }
        }
    }

    fn create_missing_directories(&self, path: &Path) -> io::Result<()> {
        let Some(directory) = path.parent() else {
            return Ok(());
        };

        if directory.exists() {
            return Ok(());
        }

        fs::create_dir_all(directory)?;
        self.apply_permissions(directory);
        if let Some(shard) = directory.parent() {
            self.apply_permissions(shard);
        }

        Ok(())
    }

    #[cfg(unix)]
    fn apply_permissions(&self, path: &Path) {
        use std::os::unix::fs::PermissionsExt;

        let Some(mode) = self.permissions else {
            return;
        };

        let current = match fs::metadata(path) {
            Ok(metadata) => metadata.permissions().mode() & 0o7777,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat cache path");
                return;
            }
        };

        if current != mode {
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                warn!(path = %path.display(), error = %e, "failed to chmod cache path");
            }
        }
    }

    #[cfg(not(unix))]
    fn apply_permissions(&self, _path: &Path) {}
}

impl Backend for FileBackend {
    // == Get ==
    fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;

        let path = self.entry_path(key);
        let Some(entry) = self.read_entry(&path) else {
            return Ok(None);
        };

        if is_expired(entry.expiry, current_timestamp()) {
            if let Err(e) = fs::remove_file(&path) {
                debug!(key, error = %e, "failed to remove expired cache file");
            }
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    // == Set ==
    fn set(&self, key: &str, value: Value, ttl: Option<Ttl>) -> Result<bool> {
        validate_key(key)?;

        let path = self.entry_path(key);
        if let Err(e) = self.create_missing_directories(&path) {
            warn!(key, error = %e, "failed to create cache directory");
            return Ok(false);
        }

        let bytes = match CacheEntry::new(value, ttl).to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "failed to encode cache entry");
                return Ok(false);
            }
        };

        if bytes.is_empty() {
            return Ok(false);
        }

        match fs::write(&path, &bytes) {
            Ok(()) => {
                self.apply_permissions(&path);
                Ok(true)
            }
            Err(e) => {
                warn!(key, error = %e, "failed to write cache file");
                Ok(false)
            }
        }
    }

    // == Delete ==
    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        Ok(fs::remove_file(self.entry_path(key)).is_ok())
    }

    // == Clear ==
    /// Empties the root directory but keeps the directory itself.
    fn clear(&self) -> bool {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "nothing to clear");
                return true;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };

            if let Err(e) = removed {
                warn!(path = %path.display(), error = %e, "failed to remove cache path");
            }
        }

        true
    }

    // == Has ==
    fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        Ok(self
            .read_entry(&self.entry_path(key))
            .is_some_and(|entry| !is_expired(entry.expiry, current_timestamp())))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use serde_json::json;
    use tempfile::TempDir;

    fn backend() -> (TempDir, FileBackend) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path(), None);
        (dir, backend)
    }

    #[test]
    fn test_entry_path_is_sharded() {
        let (dir, backend) = backend();
        let path = backend.entry_path("test.key");

        let digest = path.file_name().unwrap().to_str().unwrap().to_string();
        assert_eq!(digest.len(), 64);
        assert_eq!(
            path,
            dir.path().join(&digest[0..2]).join(&digest[2..4]).join(&digest)
        );
        assert_eq!(backend.entry_path("test.key"), path);
        assert_ne!(backend.entry_path("other.key"), path);
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, backend) = backend();

        assert!(backend.set("test.key", json!("test_value"), None).unwrap());
        assert!(backend.entry_path("test.key").is_file());
        assert_eq!(backend.get("test.key").unwrap(), Some(json!("test_value")));
    }

    #[test]
    fn test_composite_values() {
        let (_dir, backend) = backend();
        let value = json!({"list": [1, 2.5, "three"], "flag": true, "none": null});

        backend.set("composite", value.clone(), None).unwrap();
        assert_eq!(backend.get("composite").unwrap(), Some(value));
    }

    #[test]
    fn test_persists_across_instances() {
        let (dir, backend) = backend();
        backend.set("persist", json!([1, 2, 3]), None).unwrap();
        drop(backend);

        let reopened = FileBackend::new(dir.path(), None);
        assert_eq!(reopened.get("persist").unwrap(), Some(json!([1, 2, 3])));
    }

    #[test]
    fn test_expired_entry_removed_on_get() {
        let (_dir, backend) = backend();
        backend.set("k", json!("v"), Some(Ttl::Seconds(0))).unwrap();
        let path = backend.entry_path("k");

        assert!(path.exists());
        assert!(!backend.has("k").unwrap());
        assert!(path.exists());

        assert_eq!(backend.get("k").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_malformed_file_is_miss() {
        let (_dir, backend) = backend();
        backend.set("k", json!("v"), None).unwrap();
        fs::write(backend.entry_path("k"), b"{\"expiry\": 1}").unwrap();

        assert_eq!(backend.get("k").unwrap(), None);
        assert!(!backend.has("k").unwrap());

        fs::write(backend.entry_path("k"), b"garbage").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let (_dir, backend) = backend();
        backend.set("k", json!("v"), None).unwrap();

        assert!(backend.delete("k").unwrap());
        assert!(!backend.delete("k").unwrap());
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[test]
    fn test_clear_keeps_root() {
        let (dir, backend) = backend();
        backend.set("a", json!(1), None).unwrap();
        backend.set("b", json!(2), None).unwrap();
        fs::write(dir.path().join("stray"), b"x").unwrap();

        assert!(backend.clear());
        assert!(backend.clear());
        assert!(dir.path().is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_missing_root() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("never-created"), None);

        assert!(backend.clear());
    }

    #[test]
    fn test_set_many_validates_before_writing() {
        let (dir, backend) = backend();

        let result = backend.set_many(&[("valid.key", json!("a")), ("", json!("b"))], None);

        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
        assert!(!backend.has("valid.key").unwrap());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_failure_reports_false() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"a file, not a directory").unwrap();
        let backend = FileBackend::new(&blocker, None);

        assert!(!backend.set("k", json!("v"), None).unwrap());
        assert_eq!(backend.get("k").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_permissions_applied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path(), Some(0o700));
        backend.set("k", json!("v"), None).unwrap();

        let path = backend.entry_path("k");
        let leaf = path.parent().unwrap();
        let shard = leaf.parent().unwrap();
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o7777;

        assert_eq!(mode(leaf), 0o700);
        assert_eq!(mode(shard), 0o700);
        assert_eq!(mode(&path), 0o700);
    }
}
