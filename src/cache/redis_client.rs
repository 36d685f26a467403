//! Redis Client Module
//!
//! [`KvClient`] implementation over the synchronous `redis` API.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use redis::{Connection, RedisResult};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::cache::remote::KvClient;
use crate::error::{CacheError, Result};

/// Connection parameters recognized in a redis store configuration.
/// Anything else is dropped without complaint.
pub const ALLOWED_PARAMETERS: &[&str] = &[
    "scheme",
    "host",
    "port",
    "path",
    "database",
    "password",
    "username",
    "timeout",
    "read_write_timeout",
];

// == Redis Params ==
#[derive(Debug, Clone, PartialEq)]
pub struct RedisParams {
    /// `tcp` or `unix`
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Socket path when `scheme` is `unix`
    pub path: Option<PathBuf>,
    pub database: i64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Connect timeout in seconds
    pub timeout: Option<f64>,
    /// Read and write timeout in seconds
    pub read_write_timeout: Option<f64>,
}

impl Default for RedisParams {
    fn default() -> Self {
        Self {
            scheme: "tcp".to_string(),
            host: "127.0.0.1".to_string(),
            port: 6379,
            path: None,
            database: 0,
            username: None,
            password: None,
            timeout: Some(5.0),
            read_write_timeout: None,
        }
    }
}

impl RedisParams {
    /// Builds parameters from a loose configuration map, keeping only the
    /// names listed in [`ALLOWED_PARAMETERS`] and defaulting the rest.
    pub fn from_config(config: &BTreeMap<String, Value>) -> Result<Self> {
        let mut params = Self::default();

        for (name, value) in config {
            if !ALLOWED_PARAMETERS.contains(&name.as_str()) {
                debug!(parameter = %name, "ignoring unrecognized redis parameter");
                continue;
            }

            let text = match value {
                Value::String(s) => s.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            let invalid = || {
                CacheError::Configuration(format!("invalid redis parameter {name}: {text}"))
            };

            match name.as_str() {
                "scheme" => params.scheme = text.clone(),
                "host" => params.host = text.clone(),
                "port" => params.port = text.parse().map_err(|_| invalid())?,
                "path" => params.path = Some(PathBuf::from(&text)),
                "database" => params.database = text.parse().map_err(|_| invalid())?,
                "username" => params.username = Some(text.clone()),
                "password" => params.password = Some(text.clone()),
                "timeout" => params.timeout = Some(text.parse().map_err(|_| invalid())?),
                "read_write_timeout" => {
                    params.read_write_timeout = Some(text.parse().map_err(|_| invalid())?)
                }
                _ => {}
            }
        }

        Ok(params)
    }

    /// Renders the parameters as a `redis://` or `redis+unix://` URL.
    pub fn to_url(&self) -> Result<String> {
        let invalid = |what: &str| CacheError::Configuration(format!("invalid redis {what}"));

        let mut url = match self.scheme.as_str() {
            "tcp" | "redis" => {
                let mut url = Url::parse("redis://localhost").map_err(|_| invalid("url"))?;
                url.set_host(Some(&self.host)).map_err(|_| invalid("host"))?;
                url.set_port(Some(self.port)).map_err(|_| invalid("port"))?;
                url.set_path(&format!("/{}", self.database));
                url
            }
            "unix" => {
                let path = self.path.as_ref().ok_or_else(|| invalid("socket path"))?;
                let mut url = Url::parse("redis+unix:///").map_err(|_| invalid("url"))?;
                url.set_path(&path.to_string_lossy());
                let mut query = url.query_pairs_mut();
                query.append_pair("db", &self.database.to_string());
                if let Some(username) = &self.username {
                    query.append_pair("user", username);
                }
                if let Some(password) = &self.password {
                    query.append_pair("pass", password);
                }
                drop(query);
                return Ok(url.to_string());
            }
            other => {
                return Err(CacheError::Configuration(format!(
                    "unsupported redis scheme: {other}"
                )))
            }
        };

        if let Some(username) = &self.username {
            url.set_username(username).map_err(|_| invalid("username"))?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|_| invalid("password"))?;
        }

        Ok(url.to_string())
    }
}

fn seconds(value: Option<f64>) -> Option<Duration> {
    value
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64)
}

// == Redis Client ==
/// Blocking redis client holding at most one open connection.
///
/// The connection is opened on first use and dropped after any failed
/// command, so the next call reconnects. Commands are never retried.
pub struct RedisClient {
    client: redis::Client,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
    connection: Mutex<Option<Connection>>,
}

impl RedisClient {
    /// Creates a client without connecting.
    pub fn new(params: &RedisParams) -> Result<Self> {
        let client = redis::Client::open(params.to_url()?.as_str())
            .map_err(|e| CacheError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            connect_timeout: seconds(params.timeout),
            io_timeout: seconds(params.read_write_timeout),
            connection: Mutex::new(None),
        })
    }

    fn connect(&self) -> RedisResult<Connection> {
        let connection = match self.connect_timeout {
            Some(timeout) => self.client.get_connection_with_timeout(timeout)?,
            None => self.client.get_connection()?,
        };

        if self.io_timeout.is_some() {
            connection.set_read_timeout(self.io_timeout)?;
            connection.set_write_timeout(self.io_timeout)?;
        }

        Ok(connection)
    }

    fn run<T>(
        &self,
        command: &str,
        f: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> anyhow::Result<T> {
        let mut slot = self.connection.lock();

        let mut connection = match slot.take() {
            Some(connection) => connection,
            None => self.connect().context("failed to connect to redis")?,
        };

        let result = f(&mut connection).with_context(|| format!("redis {command} failed"))?;
        *slot = Some(connection);
        Ok(result)
    }
}

impl KvClient for RedisClient {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.run("GET", |c| redis::cmd("GET").arg(key).query(c))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<bool> {
        self.run("SET", |c| redis::cmd("SET").arg(key).arg(value).query::<()>(c))?;
        Ok(true)
    }

    fn set_expiring(&self, key: &str, seconds: u64, value: &[u8]) -> anyhow::Result<bool> {
        self.run("SETEX", |c| {
            redis::cmd("SETEX")
                .arg(key)
                .arg(seconds)
                .arg(value)
                .query::<()>(c)
        })?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> anyhow::Result<u64> {
        self.run("DEL", |c| redis::cmd("DEL").arg(key).query(c))
    }

    fn exists(&self, key: &str) -> anyhow::Result<bool> {
        self.run("EXISTS", |c| redis::cmd("EXISTS").arg(key).query(c))
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.run("FLUSHDB", |c| redis::cmd("FLUSHDB").query(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let params = RedisParams::from_config(&BTreeMap::new()).unwrap();

        assert_eq!(params, RedisParams::default());
        assert_eq!(params.to_url().unwrap(), "redis://127.0.0.1:6379/0");
    }

    #[test]
    fn test_unrecognized_parameters_dropped() {
        let params = RedisParams::from_config(&config(&[
            ("host", json!("cache.internal")),
            ("port", json!(6380)),
            ("persistent", json!(true)),
            ("weight", json!(3)),
        ]))
        .unwrap();

        assert_eq!(params.host, "cache.internal");
        assert_eq!(params.port, 6380);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let params = RedisParams::from_config(&config(&[
            ("port", json!("6381")),
            ("database", json!("2")),
            ("timeout", json!(0.5)),
        ]))
        .unwrap();

        assert_eq!(params.port, 6381);
        assert_eq!(params.database, 2);
        assert_eq!(params.timeout, Some(0.5));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = RedisParams::from_config(&config(&[("port", json!("http"))]));
        assert!(matches!(result, Err(CacheError::Configuration(_))));
    }

    #[test]
    fn test_credentials_in_url() {
        let params = RedisParams {
            username: Some("app".into()),
            password: Some("p@ss word".into()),
            database: 3,
            ..RedisParams::default()
        };

        let url = params.to_url().unwrap();
        assert!(url.starts_with("redis://app:"));
        assert!(url.ends_with("@127.0.0.1:6379/3"));
        assert!(!url.contains(' '));
    }

    #[test]
    fn test_unix_socket_url() {
        let params = RedisParams {
            scheme: "unix".into(),
            path: Some(PathBuf::from("/run/redis.sock")),
            ..RedisParams::default()
        };

        assert_eq!(
            params.to_url().unwrap(),
            "redis+unix:///run/redis.sock?db=0"
        );

        let missing_path = RedisParams {
            scheme: "unix".into(),
            ..RedisParams::default()
        };
        assert!(missing_path.to_url().is_err());
    }

    #[test]
    fn test_client_creation_does_not_connect() {
        let params = RedisParams {
            port: 1,
            ..RedisParams::default()
        };

        assert!(RedisClient::new(&params).is_ok());
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        let params = RedisParams {
            port: 1,
            timeout: Some(0.2),
            ..RedisParams::default()
        };
        let client = RedisClient::new(&params).unwrap();

        assert!(client.get("k").is_err());
        assert!(client.exists("k").is_err());
    }
}
