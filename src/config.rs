//! Cache configuration.
//!
//! Configuration is plain data: build it in code, deserialize it from JSON,
//! or read it from `CACHE_*` environment variables, then hand it to
//! [`crate::factory::build`].

use crate::error::{Error, Result};
use crate::store::DEFAULT_CACHE_MINUTES;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Backend driver identifier.
///
/// Deserialized from a string through [`FromStr`], so JSON and environment
/// configuration accept the same names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Driver {
    #[default]
    InMemory,
    File,
    Memcached,
    Redis,
    Database,
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inmemory" | "memory" | "array" => Ok(Driver::InMemory),
            "file" => Ok(Driver::File),
            "memcached" => Ok(Driver::Memcached),
            "redis" => Ok(Driver::Redis),
            "database" => Ok(Driver::Database),
            other => Err(Error::UnknownDriver(other.to_string())),
        }
    }
}

impl TryFrom<String> for Driver {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Driver::InMemory => "inmemory",
            Driver::File => "file",
            Driver::Memcached => "memcached",
            Driver::Redis => "redis",
            Driver::Database => "database",
        };
        f.write_str(name)
    }
}

/// Settings for every driver; each driver reads only its own fields.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub driver: Driver,
    /// Namespace prepended to keys by shared backends.
    pub prefix: String,
    /// Directory for the file driver.
    pub path: PathBuf,
    pub default_minutes: u64,
    pub memcached_servers: Vec<String>,
    pub memcached_pool_size: u32,
    pub redis_url: String,
    pub redis_pool_size: usize,
    pub database_url: String,
    pub database_table: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            driver: Driver::InMemory,
            prefix: String::new(),
            path: std::env::temp_dir().join("cache-store"),
            default_minutes: DEFAULT_CACHE_MINUTES,
            memcached_servers: vec!["localhost:11211".to_string()],
            memcached_pool_size: 10,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            redis_pool_size: 16,
            database_url: "sqlite::memory:".to_string(),
            database_table: "cache".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::ConfigError(format!("Invalid value for {}: {}", name, raw)))
}

impl CacheConfig {
    /// Parse configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    /// - `Error::UnknownDriver`: `driver` names no known backend
    /// - `Error::ConfigError`: malformed JSON or a field of the wrong type
    pub fn from_json(json: &str) -> Result<Self> {
        let invalid = |e: serde_json::Error| {
            Error::ConfigError(format!("Invalid cache configuration: {}", e))
        };

        let mut raw: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        let driver = match raw.as_object_mut().and_then(|map| map.remove("driver")) {
            Some(serde_json::Value::String(name)) => name.parse()?,
            Some(other) => {
                return Err(Error::ConfigError(format!(
                    "Invalid cache configuration: driver must be a string, got {}",
                    other
                )))
            }
            None => Driver::default(),
        };

        let mut config: CacheConfig = serde_json::from_value(raw).map_err(invalid)?;
        config.driver = driver;
        Ok(config)
    }

    /// Read configuration from the process environment.
    ///
    /// Unset variables keep their defaults; set but unparseable ones fail.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CacheConfig::default();

        if let Some(driver) = lookup("CACHE_DRIVER") {
            config.driver = driver.parse()?;
        }
        if let Some(prefix) = lookup("CACHE_PREFIX") {
            config.prefix = prefix;
        }
        if let Some(path) = lookup("CACHE_PATH") {
            config.path = PathBuf::from(path);
        }
        if let Some(minutes) = lookup("CACHE_DEFAULT_MINUTES") {
            config.default_minutes = parse_var("CACHE_DEFAULT_MINUTES", &minutes)?;
        }
        if let Some(servers) = lookup("MEMCACHED_SERVERS") {
            config.memcached_servers = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(size) = lookup("MEMCACHED_POOL_SIZE") {
            config.memcached_pool_size = parse_var("MEMCACHED_POOL_SIZE", &size)?;
        }
        if let Some(url) = lookup("REDIS_URL") {
            config.redis_url = url;
        }
        if let Some(size) = lookup("REDIS_POOL_SIZE") {
            config.redis_pool_size = parse_var("REDIS_POOL_SIZE", &size)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }
        if let Some(table) = lookup("CACHE_TABLE") {
            config.database_table = table;
        }

        Ok(config)
    }
}
