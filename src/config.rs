//! Configuration Module
//!
//! Handles loading server and store configuration from environment variables.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

/// Environment prefix of redis connection parameters, e.g. `CACHE_REDIS_HOST`.
const REDIS_ENV_PREFIX: &str = "CACHE_REDIS_";

// == Store Configuration ==
/// Configuration consumed by the backend registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store returned when no name is given
    pub default_store: String,
    pub file: FileStoreConfig,
    pub redis: RedisStoreConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_store: "file".to_string(),
            file: FileStoreConfig::default(),
            redis: RedisStoreConfig::default(),
        }
    }
}

/// Settings of the built-in file store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Root directory, `multicache` under the system temp dir when unset
    pub path: Option<PathBuf>,
    /// Unix mode for created directories and files
    pub permissions: Option<u32>,
}

/// Settings of the built-in redis store.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RedisStoreConfig {
    /// Prepended to every key
    pub prefix: String,
    /// Connection parameters; only recognized names are used
    #[serde(flatten)]
    pub parameters: BTreeMap<String, Value>,
}

// == Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Store registry configuration
    pub stores: StoreConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DEFAULT_STORE` - Store used when none is named (default: file)
    /// - `CACHE_FILE_PATH` - File store root (default: `$TMPDIR/multicache`)
    /// - `CACHE_FILE_PERMISSIONS` - Octal mode such as `0750` (default: unset)
    /// - `CACHE_REDIS_PREFIX` - Key prefix of the redis store (default: empty)
    /// - `CACHE_REDIS_<PARAM>` - Redis connection parameter, e.g. `CACHE_REDIS_HOST`
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Builds a Config from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let defaults = Self::default();

        let redis_parameters = vars
            .iter()
            .filter_map(|(name, value)| {
                let parameter = name.strip_prefix(REDIS_ENV_PREFIX)?;
                (parameter != "PREFIX")
                    .then(|| (parameter.to_lowercase(), Value::String(value.clone())))
            })
            .collect();

        Self {
            server_port: vars
                .get("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            stores: StoreConfig {
                default_store: vars
                    .get("CACHE_DEFAULT_STORE")
                    .cloned()
                    .unwrap_or(defaults.stores.default_store),
                file: FileStoreConfig {
                    path: vars.get("CACHE_FILE_PATH").map(PathBuf::from),
                    permissions: vars
                        .get("CACHE_FILE_PERMISSIONS")
                        .and_then(|v| parse_mode(v)),
                },
                redis: RedisStoreConfig {
                    prefix: vars.get("CACHE_REDIS_PREFIX").cloned().unwrap_or_default(),
                    parameters: redis_parameters,
                },
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            stores: StoreConfig::default(),
        }
    }
}

/// Parses an octal file mode, with or without a `0o` prefix.
fn parse_mode(value: &str) -> Option<u32> {
    let digits = value.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8).ok()
}
