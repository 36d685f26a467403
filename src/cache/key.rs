//! Key Validation Module
//!
//! Every backend runs keys through these checks before touching storage.

use crate::error::{CacheError, Result};

/// Characters that may never appear in a cache key.
pub const RESERVED_KEY_CHARS: &str = "{}()/\\@:";

// == Validate Key ==
/// Validates a single cache key.
///
/// A key is rejected when it is empty after trimming or contains any of
/// the characters in [`RESERVED_KEY_CHARS`].
pub fn validate_key(key: &str) -> Result<()> {
    let key = key.trim();

    if key.is_empty() {
        return Err(CacheError::InvalidKey(
            "Cache key cannot be empty".to_string(),
        ));
    }

    if key.contains(|c| RESERVED_KEY_CHARS.contains(c)) {
        return Err(CacheError::InvalidKey(format!(
            "Cache key cannot contain the following characters: {}",
            RESERVED_KEY_CHARS
        )));
    }

    Ok(())
}

/// Validates a key received as raw bytes, rejecting anything that is not UTF-8.
pub fn validate_key_bytes(key: &[u8]) -> Result<&str> {
    let key = std::str::from_utf8(key).map_err(|_| {
        CacheError::InvalidKey("Cache key must be UTF-8 encoded".to_string())
    })?;
    validate_key(key)?;
    Ok(key)
}

// == Validate Keys ==
/// Validates keys in iteration order, stopping at the first invalid one.
pub fn validate_keys<'a, I>(keys: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().try_for_each(validate_key)
}
