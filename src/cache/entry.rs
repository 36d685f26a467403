//! Cache Entry Module
//!
//! Defines the `{value, expiry}` record shared by all backends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::expiry::{compute_expiry, current_timestamp, is_expired, Ttl};

// == Cache Entry ==
/// A single stored value together with its absolute expiry.
///
/// This is also the on-disk shape of a file entry. Decoding fails when
/// `value` is missing or `expiry` is not an integer, which callers treat
/// as a miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Expiration timestamp (Unix seconds)
    pub expiry: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring according to `ttl`.
    pub fn new(value: Value, ttl: Option<Ttl>) -> Self {
        Self {
            value,
            expiry: compute_expiry(ttl),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at the current second.
    pub fn is_expired(&self) -> bool {
        is_expired(self.expiry, current_timestamp())
    }

    // == Time To Live ==
    /// Returns remaining seconds before expiry, `0` once expired.
    pub fn ttl_remaining(&self) -> i64 {
        (self.expiry - current_timestamp()).max(0)
    }

    /// Encodes the entry as JSON bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decodes an entry previously produced by [`CacheEntry::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
