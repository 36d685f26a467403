//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::Ttl;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds; zero or negative expires immediately
/// - `store`: Optional store name, the default store when absent
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub store: Option<String>,
}

impl SetRequest {
    /// TTL in the form the backends take.
    pub fn ttl(&self) -> Option<Ttl> {
        self.ttl.map(Ttl::Seconds)
    }
}

/// Query string selecting a store, e.g. `?store=array`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreQuery {
    #[serde(default)]
    pub store: Option<String>,
}
