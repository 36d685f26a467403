//! Multicache - one cache API over memory, file and redis stores
//!
//! Stores are looked up by name through a [`BackendRegistry`], share key
//! validation and TTL rules, and report every operation to an optional
//! observer. An axum front-end exposes them over HTTP.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod observe;

pub use api::AppState;
pub use cache::{Backend, Ttl};
pub use config::{Config, StoreConfig};
pub use error::{CacheError, Result};
pub use manager::BackendRegistry;
pub use observe::{Cache, CacheEvent, CacheObserver, StatsObserver};
