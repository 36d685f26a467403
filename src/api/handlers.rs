//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint. Backend calls may
//! touch the disk or the network, so they run on the blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::warn;

use crate::cache::Backend;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::manager::BackendRegistry;
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HasResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse, StoreQuery,
};
use crate::observe::{Cache, StatsObserver};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Named stores, created on first use
    pub registry: Arc<BackendRegistry>,
    /// Counters fed by every store of the registry
    pub stats: Arc<StatsObserver>,
}

impl AppState {
    /// Creates a new AppState around an existing registry.
    ///
    /// `stats` only sees events if the registry was built with it as observer.
    pub fn new(registry: Arc<BackendRegistry>, stats: Arc<StatsObserver>) -> Self {
        Self { registry, stats }
    }

    /// Creates a new AppState from configuration, wiring the stats observer
    /// into the registry.
    pub fn from_config(config: &Config) -> Self {
        let stats = Arc::new(StatsObserver::new());
        let registry = BackendRegistry::new(config.stores.clone()).with_observer(stats.clone());
        Self::new(Arc::new(registry), stats)
    }
}

/// Resolves `store` and runs `f` against it on the blocking pool.
async fn with_store<T, F>(state: &AppState, store: Option<String>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Cache) -> Result<T> + Send + 'static,
{
    let registry = Arc::clone(&state.registry);

    tokio::task::spawn_blocking(move || {
        let cache = registry.backend(store.as_deref())?;
        f(cache.as_ref())
    })
    .await
    .map_err(|e| CacheError::Internal(e.to_string()))?
}

/// Handler for PUT /set
///
/// Stores any JSON value under a key with an optional TTL in seconds.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let ttl = req.ttl();
    let SetRequest {
        key, value, store, ..
    } = req;

    with_store(&state, store, move |cache| {
        if !cache.set(&key, value, ttl)? {
            warn!(store = cache.name(), key = %key, "write refused by store");
            return Err(CacheError::StorageUnavailable(format!(
                "store '{}' refused to write key '{}'",
                cache.name(),
                key
            )));
        }
        Ok(Json(SetResponse::new(cache.name(), key)))
    })
    .await
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key. A miss, including an expired entry, is a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<GetResponse>> {
    with_store(&state, query.store, move |cache| match cache.get(&key)? {
        Some(value) => Ok(Json(GetResponse::new(cache.name(), key, value))),
        None => Err(CacheError::NotFound(key)),
    })
    .await
}

/// Handler for GET /has/:key
pub async fn has_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<HasResponse>> {
    with_store(&state, query.store, move |cache| {
        let exists = cache.has(&key)?;
        Ok(Json(HasResponse::new(cache.name(), key, exists)))
    })
    .await
}

/// Handler for DELETE /del/:key
///
/// Deletes a key; a key that was not stored is a 404.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<DeleteResponse>> {
    with_store(&state, query.store, move |cache| {
        if !cache.delete(&key)? {
            return Err(CacheError::NotFound(key));
        }
        Ok(Json(DeleteResponse::new(cache.name(), key)))
    })
    .await
}

/// Handler for POST /clear
///
/// Empties one store. On the redis store this flushes the whole database.
pub async fn clear_handler(
    State(state): State<AppState>,
    Query(query): Query<StoreQuery>,
) -> Result<Json<ClearResponse>> {
    with_store(&state, query.store, |cache| {
        if !cache.clear() {
            return Err(CacheError::StorageUnavailable(format!(
                "store '{}' could not be cleared",
                cache.name()
            )));
        }
        Ok(Json(ClearResponse::new(cache.name())))
    })
    .await
}

/// Handler for GET /stats
///
/// Returns counters aggregated over every store.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.stats.snapshot().into())
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
