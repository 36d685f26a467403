//! Observable Cache Module
//!
//! [`Cache`] wraps a backend under a store name and reports the outcome of
//! every operation to an optional [`CacheObserver`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::CacheEvent;
use crate::cache::{Backend, Ttl};
use crate::error::Result;

// == Cache Observer ==
/// Receiver of cache events.
///
/// Called synchronously after each operation; implementations must return
/// quickly. A panicking observer is logged and otherwise ignored.
pub trait CacheObserver: Send + Sync {
    fn notify(&self, event: &CacheEvent);
}

// == Cache ==
pub struct Cache {
    name: String,
    store: Arc<dyn Backend>,
    observer: Option<Arc<dyn CacheObserver>>,
}

impl Cache {
    // == Constructor ==
    pub fn new(
        name: impl Into<String>,
        store: Arc<dyn Backend>,
        observer: Option<Arc<dyn CacheObserver>>,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            observer,
        }
    }

    /// Name of the store this cache was built for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped backend.
    pub fn store(&self) -> &Arc<dyn Backend> {
        &self.store
    }

    // == Remember ==
    /// Returns the cached value for `key`, or computes it with `f`, stores
    /// it with `ttl` and returns it. A cached `null` counts as absent.
    pub fn remember<F>(&self, key: &str, ttl: Option<Ttl>, f: F) -> Result<Value>
    where
        F: FnOnce() -> Value,
    {
        if let Some(value) = self.get(key)? {
            if !value.is_null() {
                return Ok(value);
            }
        }

        let value = f();
        self.set(key, value.clone(), ttl)?;
        Ok(value)
    }

    // == Typed Access ==
    /// Reads and decodes a value; a value of another shape is a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        Ok(self
            .get(key)?
            .and_then(|value| match serde_json::from_value(value) {
                Ok(typed) => Some(typed),
                Err(e) => {
                    debug!(store = %self.name, key, error = %e, "cached value has another shape");
                    None
                }
            }))
    }

    /// Encodes and stores a value; an unencodable value is a failed write.
    pub fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Ttl>) -> Result<bool> {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl),
            Err(e) => {
                self.check_key(key)?;
                warn!(store = %self.name, key, error = %e, "value cannot be encoded");
                Ok(false)
            }
        }
    }

    fn emit(&self, event: impl FnOnce(String) -> CacheEvent) {
        let Some(observer) = &self.observer else {
            return;
        };

        let event = event(self.name.clone());
        if catch_unwind(AssertUnwindSafe(|| observer.notify(&event))).is_err() {
            warn!(store = %self.name, event = event.kind(), "cache observer panicked");
        }
    }
}

fn owned_keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

fn owned_entries(entries: &[(&str, Value)]) -> Vec<(String, Value)> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

impl Backend for Cache {
    fn check_key(&self, key: &str) -> Result<()> {
        self.store.check_key(key)
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        let value = self.store.get(key)?;

        match &value {
            Some(value) => self.emit(|store| CacheEvent::Hit {
                store,
                key: key.to_string(),
                value: value.clone(),
            }),
            None => self.emit(|store| CacheEvent::Missed {
                store,
                key: key.to_string(),
            }),
        }

        Ok(value)
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Ttl>) -> Result<bool> {
        let success = self.store.set(key, value.clone(), ttl)?;

        let key = key.to_string();
        if success {
            self.emit(|store| CacheEvent::Written {
                store,
                key,
                value,
                ttl,
            });
        } else {
            self.emit(|store| CacheEvent::WriteMissed {
                store,
                key,
                value,
                ttl,
            });
        }

        Ok(success)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let success = self.store.delete(key)?;

        let key = key.to_string();
        if success {
            self.emit(|store| CacheEvent::Deleted { store, key });
        } else {
            self.emit(|store| CacheEvent::DeleteMissed { store, key });
        }

        Ok(success)
    }

    fn clear(&self) -> bool {
        let success = self.store.clear();

        if success {
            self.emit(|store| CacheEvent::Cleared { store });
        } else {
            self.emit(|store| CacheEvent::ClearMissed { store });
        }

        success
    }

    fn has(&self, key: &str) -> Result<bool> {
        let found = self.store.has(key)?;

        let key = key.to_string();
        if found {
            self.emit(|store| CacheEvent::Has { store, key });
        } else {
            self.emit(|store| CacheEvent::HasMissed { store, key });
        }

        Ok(found)
    }

    fn get_many(&self, keys: &[&str]) -> Result<Vec<(String, Option<Value>)>> {
        let results = self.store.get_many(keys)?;

        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for (key, value) in &results {
            match value {
                Some(value) => hits.push((key.clone(), value.clone())),
                None => misses.push(key.clone()),
            }
        }

        if !hits.is_empty() {
            self.emit(|store| CacheEvent::MultipleHit {
                store,
                values: hits,
            });
        }
        if !misses.is_empty() {
            self.emit(|store| CacheEvent::MultipleMissed {
                store,
                keys: misses,
            });
        }

        Ok(results)
    }

    fn set_many(&self, entries: &[(&str, Value)], ttl: Option<Ttl>) -> Result<bool> {
        let success = self.store.set_many(entries, ttl)?;

        if success {
            self.emit(|store| CacheEvent::MultipleWritten {
                store,
                values: owned_entries(entries),
                ttl,
            });
        } else {
            self.emit(|store| CacheEvent::MultipleWriteMissed {
                store,
                values: owned_entries(entries),
                ttl,
            });
        }

        Ok(success)
    }

    fn delete_many(&self, keys: &[&str]) -> Result<bool> {
        let success = self.store.delete_many(keys)?;

        if success {
            self.emit(|store| CacheEvent::MultipleDeleted {
                store,
                keys: owned_keys(keys),
            });
        } else {
            self.emit(|store| CacheEvent::MultipleDeleteMissed {
                store,
                keys: owned_keys(keys),
            });
        }

        Ok(success)
    }
}
