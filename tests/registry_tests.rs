//! Integration Tests for the Backend Registry
//!
//! Exercises the public library surface the way an embedding application would.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use multicache::{
    cache::MemoryBackend, config::FileStoreConfig, Backend, BackendRegistry, CacheError,
    CacheEvent, CacheObserver, StatsObserver, StoreConfig, Ttl,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tempfile::TempDir;

// == Helper Types ==

/// Custom backend living outside the crate: stores values without expiry.
#[derive(Default)]
struct MapBackend {
    values: RwLock<HashMap<String, Value>>,
}

impl Backend for MapBackend {
    fn get(&self, key: &str) -> multicache::Result<Option<Value>> {
        self.check_key(key)?;
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value, _ttl: Option<Ttl>) -> multicache::Result<bool> {
        self.check_key(key)?;
        self.values.write().insert(key.to_string(), value);
        Ok(true)
    }

    fn delete(&self, key: &str) -> multicache::Result<bool> {
        self.check_key(key)?;
        Ok(self.values.write().remove(key).is_some())
    }

    fn clear(&self) -> bool {
        self.values.write().clear();
        true
    }

    fn has(&self, key: &str) -> multicache::Result<bool> {
        self.check_key(key)?;
        Ok(self.values.read().contains_key(key))
    }
}

#[derive(Default)]
struct EventLog {
    kinds: Mutex<Vec<(String, &'static str)>>,
}

impl CacheObserver for EventLog {
    fn notify(&self, event: &CacheEvent) {
        self.kinds
            .lock()
            .push((event.store().to_string(), event.kind()));
    }
}

fn file_config(dir: &TempDir) -> StoreConfig {
    StoreConfig {
        file: FileStoreConfig {
            path: Some(dir.path().to_path_buf()),
            permissions: None,
        },
        ..StoreConfig::default()
    }
}

// == File Persistence ==

#[test]
fn test_file_store_survives_registry_recreation() {
    let dir = TempDir::new().unwrap();

    {
        let registry = BackendRegistry::new(file_config(&dir));
        let cache = registry.backend(Some("file")).unwrap();
        assert!(cache
            .set("report.2024", json!({"rows": 12}), Some(Ttl::Delta(Duration::hours(1))))
            .unwrap());
    }

    let registry = BackendRegistry::new(file_config(&dir));
    let cache = registry.backend(None).unwrap();
    assert_eq!(cache.get("report.2024").unwrap(), Some(json!({"rows": 12})));
}

#[test]
fn test_month_ttl_is_live() {
    let dir = TempDir::new().unwrap();
    let registry = BackendRegistry::new(file_config(&dir));
    let cache = registry.backend(None).unwrap();

    cache.set("monthly", json!(1), Some(Ttl::Months(1))).unwrap();
    assert!(cache.has("monthly").unwrap());

    cache.set("never", json!(1), Some(Ttl::Months(0))).unwrap();
    assert!(!cache.has("never").unwrap());
}

// == Custom Backends ==

#[test]
fn test_custom_backend_from_outside_the_crate() {
    let registry = BackendRegistry::default();
    registry
        .register_custom("map", || Ok(Arc::new(MapBackend::default())), false)
        .unwrap();

    let cache = registry.backend(Some("map")).unwrap();
    assert!(cache
        .set_many(&[("a", json!(1)), ("b", json!(2))], None)
        .unwrap());
    assert_eq!(
        cache.get_many_or(&["a", "z"], json!(0)).unwrap(),
        vec![("a".to_string(), json!(1)), ("z".to_string(), json!(0))]
    );

    // Default key validation applies to custom backends too
    assert!(matches!(
        cache.set_many(&[("ok", json!(1)), ("not/ok", json!(2))], None),
        Err(CacheError::InvalidKey(_))
    ));
    assert!(!cache.has("ok").unwrap());
}

#[test]
fn test_custom_backend_cannot_shadow_builtins() {
    let registry = BackendRegistry::default();

    let result = registry.register_custom("file", || Ok(Arc::new(MemoryBackend::new())), true);
    assert_eq!(
        result.unwrap_err().to_string(),
        "Cache store with name \"file\" already exists"
    );
}

// == Observers ==

#[test]
fn test_observer_sees_every_store() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(EventLog::default());
    let registry = BackendRegistry::new(file_config(&dir)).with_observer(log.clone());

    registry
        .backend(Some("array"))
        .unwrap()
        .set("k", json!(1), None)
        .unwrap();
    registry.backend(Some("file")).unwrap().get("k").unwrap();

    assert_eq!(
        *log.kinds.lock(),
        vec![
            ("array".to_string(), "written"),
            ("file".to_string(), "missed")
        ]
    );
}

#[test]
fn test_stats_observer_counts_remember() {
    let stats = Arc::new(StatsObserver::new());
    let registry = BackendRegistry::default().with_observer(stats.clone());
    let cache = registry.backend(Some("memory")).unwrap();

    let value = cache.remember("answer", None, || json!(42)).unwrap();
    assert_eq!(value, json!(42));
    let value = cache.remember("answer", None, || json!(0)).unwrap();
    assert_eq!(value, json!(42));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.hits, 1);
    assert_eq!(snapshot.misses, 1);
    assert_eq!(snapshot.writes, 1);
}
