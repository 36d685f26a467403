//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache backends, registry and HTTP front-end.
///
/// Storage failures on write operations are reported as `Ok(false)` by the
/// backends and on read operations as a miss, so they never show up here.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key rejected by the key validator
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// No built-in or registered store with this name
    #[error("Cache store with name \"{0}\" does not exist")]
    UnknownBackend(String),

    /// Name already taken by a custom registration or a built-in store
    #[error("Cache store with name \"{0}\" already exists")]
    BackendAlreadyRegistered(String),

    /// Built-in store could not be constructed from its configuration
    #[error("Invalid store configuration: {0}")]
    Configuration(String),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The backend refused a write, delete or clear
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_) | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UnknownBackend(_) | CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::BackendAlreadyRegistered(_) => StatusCode::CONFLICT,
            CacheError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Configuration(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
