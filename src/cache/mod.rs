//! Cache Module
//!
//! Storage backends sharing one key-validation and TTL model: process
//! memory, sharded files, and a remote key-value server.

mod entry;
pub mod expiry;
mod file;
pub mod key;
mod memory;
mod redis_client;
mod remote;


use serde_json::Value;

use crate::error::Result;

// Re-export public types
pub use entry::CacheEntry;
pub use expiry::{compute_expiry, Ttl, MAX_EXPIRY};
pub use file::FileBackend;
pub use key::{validate_key, validate_keys};
pub use memory::MemoryBackend;
pub use redis_client::{RedisClient, RedisParams};
pub use remote::{KvClient, RemoteBackend};

// == Backend ==
/// Capability implemented by every storage medium and custom store.
///
/// Key validation errors are the only errors returned. A failed write,
/// delete or clear reports `false`, and a failed read is a miss.
///
/// Batch operations validate every key before touching storage, then apply
/// the single-key operation to each key in order. A batch succeeds only if
/// every item did; earlier successes are not rolled back.
pub trait Backend: Send + Sync {
    /// Validates a key the way this backend will address it.
    fn check_key(&self, key: &str) -> Result<()> {
        validate_key(key)
    }

    /// Returns the value stored under `key`, or `None` on a miss.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous entry.
    fn set(&self, key: &str, value: Value, ttl: Option<Ttl>) -> Result<bool>;

    /// Removes `key`; returns whether something was removed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry of this backend.
    fn clear(&self) -> bool;

    /// Checks whether `key` holds a live entry.
    fn has(&self, key: &str) -> Result<bool>;

    /// Like [`Backend::get`] but falls back to `default` on a miss.
    fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<(String, Option<Value>)>> {
        for key in keys {
            self.check_key(key)?;
        }

        keys.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    fn get_many_or(&self, keys: &[&str], default: Value) -> Result<Vec<(String, Value)>> {
        Ok(self
            .get_many(keys)?
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_else(|| default.clone())))
            .collect())
    }

    fn set_many(&self, entries: &[(&str, Value)], ttl: Option<Ttl>) -> Result<bool> {
        for (key, _) in entries {
            self.check_key(key)?;
        }

        let mut success = true;
        for (key, value) in entries {
            if !self.set(key, value.clone(), ttl)? {
                success = false;
            }
        }

        Ok(success)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<bool> {
        for key in keys {
            self.check_key(key)?;
        }

        let mut success = true;
        for key in keys {
            if !self.delete(key)? {
                success = false;
            }
        }

        Ok(success)
    }
}
