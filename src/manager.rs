//! Backend Registry Module
//!
//! Builds named cache stores on first use and hands out the same instance
//! afterwards. Besides the built-in stores, callers can register factories
//! for their own backends.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::cache::{Backend, FileBackend, MemoryBackend, RedisClient, RedisParams, RemoteBackend};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::observe::{Cache, CacheObserver};

pub const ARRAY_STORE: &str = "array";
pub const MEMORY_STORE: &str = "memory";
pub const FILE_STORE: &str = "file";
pub const REDIS_STORE: &str = "redis";
pub const REMOTE_STORE: &str = "remote";

/// Names that always resolve to a built-in store and cannot be registered.
pub const RESERVED_STORES: &[&str] = &[
    ARRAY_STORE,
    MEMORY_STORE,
    FILE_STORE,
    REDIS_STORE,
    REMOTE_STORE,
];

/// Directory under the system temp dir used when no file path is configured.
pub const DEFAULT_FILE_DIR: &str = "multicache";

/// Constructor of a custom backend.
pub type BackendFactory = Arc<dyn Fn() -> Result<Arc<dyn Backend>> + Send + Sync>;

/// Maps alias names onto the name their instance is kept under.
fn canonical_name(name: &str) -> &str {
    match name {
        MEMORY_STORE => ARRAY_STORE,
        REMOTE_STORE => REDIS_STORE,
        other => other,
    }
}

// == Backend Registry ==
pub struct BackendRegistry {
    config: StoreConfig,
    observer: Option<Arc<dyn CacheObserver>>,
    stores: RwLock<HashMap<String, Arc<Cache>>>,
    custom: RwLock<HashMap<String, BackendFactory>>,
}

impl BackendRegistry {
    // == Constructor ==
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            observer: None,
            stores: RwLock::new(HashMap::new()),
            custom: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches an observer to every store created from now on.
    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn default_store(&self) -> &str {
        &self.config.default_store
    }

    // == Backend ==
    /// Returns the store called `name`, or the default store for `None`.
    ///
    /// The first call for a name constructs the store; every later call
    /// returns that same instance. Factories run under the registry lock and
    /// must not call back into the registry.
    pub fn backend(&self, name: Option<&str>) -> Result<Arc<Cache>> {
        let name = canonical_name(name.unwrap_or(&self.config.default_store));

        if let Some(cache) = self.stores.read().get(name) {
            return Ok(Arc::clone(cache));
        }

        let mut stores = self.stores.write();
        if let Some(cache) = stores.get(name) {
            return Ok(Arc::clone(cache));
        }

        let store = self.create_store(name)?;
        let cache = Arc::new(Cache::new(name, store, self.observer.clone()));
        stores.insert(name.to_string(), Arc::clone(&cache));
        info!(store = name, "cache store created");

        Ok(cache)
    }

    // == Register Custom ==
    /// Registers a factory for a custom store.
    ///
    /// Fails when `name` is a built-in store, or when it is already
    /// registered and `force` is false. A store that was already created
    /// under `name` keeps being returned.
    pub fn register_custom<F>(&self, name: &str, factory: F, force: bool) -> Result<()>
    where
        F: Fn() -> Result<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        if RESERVED_STORES.contains(&name) {
            return Err(CacheError::BackendAlreadyRegistered(name.to_string()));
        }

        let mut custom = self.custom.write();
        if !force && custom.contains_key(name) {
            return Err(CacheError::BackendAlreadyRegistered(name.to_string()));
        }

        custom.insert(name.to_string(), Arc::new(factory));
        info!(store = name, force, "custom cache store registered");
        Ok(())
    }

    fn create_store(&self, name: &str) -> Result<Arc<dyn Backend>> {
        match name {
            ARRAY_STORE => Ok(Arc::new(MemoryBackend::new())),
            FILE_STORE => Ok(self.create_file_store()),
            REDIS_STORE => self.create_redis_store(),
            _ => self.create_custom_store(name),
        }
    }

    fn create_file_store(&self) -> Arc<dyn Backend> {
        let file = &self.config.file;
        let path = file
            .path
            .clone()
            .unwrap_or_else(|| env::temp_dir().join(DEFAULT_FILE_DIR));

        Arc::new(FileBackend::new(path, file.permissions))
    }

    fn create_redis_store(&self) -> Result<Arc<dyn Backend>> {
        let redis = &self.config.redis;
        let params = RedisParams::from_config(&redis.parameters)?;
        let client = RedisClient::new(&params)?;

        Ok(Arc::new(RemoteBackend::new(
            Arc::new(client),
            redis.prefix.clone(),
        )))
    }

    fn create_custom_store(&self, name: &str) -> Result<Arc<dyn Backend>> {
        let factory = self
            .custom
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::UnknownBackend(name.to_string()))?;

        factory()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
