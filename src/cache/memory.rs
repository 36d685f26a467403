//! Memory Backend Module
//!
//! Process-local storage behind a read-write lock, living as long as the
//! backend instance.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::cache::expiry::{compute_expiry, current_timestamp, is_expired, Ttl};
use crate::cache::{validate_key, Backend};
use crate::error::Result;

/// Value kept in memory as encoded JSON so callers never share it.
#[derive(Debug, Clone)]
struct StoredItem {
    payload: Vec<u8>,
    expiry: i64,
}

// == Memory Backend ==
/// In-memory cache backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredItem>>,
}

impl MemoryBackend {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Removes `key` only if it is still expired, so a concurrent fresh
    /// `set` between the read and the write lock is kept.
    fn evict_if_expired(&self, key: &str, now: i64) {
        let mut entries = self.entries.write();
        if entries
            .get(key)
            .is_some_and(|item| is_expired(item.expiry, now))
        {
            entries.remove(key);
            debug!(key, "evicted expired memory entry");
        }
    }
}

impl Backend for MemoryBackend {
    // == Get ==
    fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;

        let now = current_timestamp();
        let item = match self.entries.read().get(key) {
            Some(item) => item.clone(),
            None => return Ok(None),
        };

        if is_expired(item.expiry, now) {
            self.evict_if_expired(key, now);
            return Ok(None);
        }

        match serde_json::from_slice(&item.payload) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(key, error = %e, "undecodable memory entry treated as miss");
                Ok(None)
            }
        }
    }

    // == Set ==
    fn set(&self, key: &str, value: Value, ttl: Option<Ttl>) -> Result<bool> {
        validate_key(key)?;

        // Value is a JSON tree, encoding it cannot fail
        let payload = serde_json::to_vec(&value).unwrap_or_default();
        let item = StoredItem {
            payload,
            expiry: compute_expiry(ttl),
        };

        self.entries.write().insert(key.to_string(), item);
        Ok(true)
    }

    // == Delete ==
    fn delete(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        Ok(self.entries.write().remove(key).is_some())
    }

    // == Clear ==
    fn clear(&self) -> bool {
        self.entries.write().clear();
        true
    }

    // == Has ==
    fn has(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let now = current_timestamp();
        Ok(self
            .entries
            .read()
            .get(key)
            .is_some_and(|item| !is_expired(item.expiry, now)))
    }
}
