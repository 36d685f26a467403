//! Remote Backend Module
//!
//! Forwards cache operations to a key-value server through [`KvClient`].
//! The server owns expiry of TTL'd keys, so nothing is checked locally.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::expiry::{seconds_until_expiry, Ttl};
use crate::cache::{validate_key, Backend};
use crate::error::Result;

// == KV Client ==
/// Raw commands of a key-value server.
pub trait KvClient: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<bool>;

    fn set_expiring(&self, key: &str, seconds: u64, value: &[u8]) -> anyhow::Result<bool>;

    /// Returns the number of removed keys.
    fn delete(&self, key: &str) -> anyhow::Result<u64>;

    fn exists(&self, key: &str) -> anyhow::Result<bool>;

    /// Drops every key of the selected database.
    fn flush(&self) -> anyhow::Result<()>;
}

// == Remote Backend ==
/// Cache backend on top of a [`KvClient`].
///
/// The optional prefix is prepended to every key before validation, so a
/// prefix containing reserved characters makes every key invalid.
///
/// `clear` flushes the whole remote database, including keys outside this
/// backend's prefix.
pub struct RemoteBackend {
    client: Arc<dyn KvClient>,
    prefix: String,
}

impl RemoteBackend {
    // == Constructor ==
    pub fn new(client: Arc<dyn KvClient>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixes and validates a key.
    fn remote_key(&self, key: &str) -> Result<String> {
        let key = format!("{}{}", self.prefix, key);
        validate_key(&key)?;
        Ok(key)
    }
}

impl Backend for RemoteBackend {
    fn check_key(&self, key: &str) -> Result<()> {
        self.remote_key(key).map(|_| ())
    }

    // == Get ==
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = self.remote_key(key)?;

        let bytes = match self.client.get(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(key = %key, error = %e, "remote get failed, treating as miss");
                return Ok(None);
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(key = %key, error = %e, "undecodable remote value treated as miss");
                Ok(None)
            }
        }
    }

    // == Set ==
    /// A TTL that is already elapsed removes the key and reports `false`.
    fn set(&self, key: &str, value: Value, ttl: Option<Ttl>) -> Result<bool> {
        let key = self.remote_key(key)?;
        let payload = serde_json::to_vec(&value).unwrap_or_default();

        let stored = match ttl {
            None => self.client.set(&key, &payload),
            Some(ttl) => {
                let seconds = seconds_until_expiry(Some(ttl), Utc::now());
                if seconds <= 0 {
                    if let Err(e) = self.client.delete(&key) {
                        warn!(key = %key, error = %e, "remote delete of expired value failed");
                    }
                    return Ok(false);
                }
                self.client.set_expiring(&key, seconds as u64, &payload)
            }
        };

        Ok(stored.unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "remote set failed");
            false
        }))
    }

    // == Delete ==
    fn delete(&self, key: &str) -> Result<bool> {
        let key = self.remote_key(key)?;

        Ok(match self.client.delete(&key) {
            Ok(removed) => removed > 0,
            Err(e) => {
                warn!(key = %key, error = %e, "remote delete failed");
                false
            }
        })
    }

    // == Clear ==
    fn clear(&self) -> bool {
        match self.client.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "remote flush failed");
                false
            }
        }
    }

    // == Has ==
    fn has(&self, key: &str) -> Result<bool> {
        let key = self.remote_key(key)?;

        Ok(self.client.exists(&key).unwrap_or_else(|e| {
            warn!(key = %key, error = %e, "remote exists failed, treating as miss");
            false
        }))
    }
}
