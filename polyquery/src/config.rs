//! Provider configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::pool::{millis, PoolConfig};
use crate::{Error, Result};

/// Which backend a provider talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Postgres,
    MySql,
    Sqlite,
    Http,
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(ProviderType::Postgres),
            "mysql" | "mariadb" => Ok(ProviderType::MySql),
            "sqlite" => Ok(ProviderType::Sqlite),
            "http" | "remote" => Ok(ProviderType::Http),
            _ => Err(Error::unknown_provider_type(s)),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Postgres => write!(f, "postgres"),
            ProviderType::MySql => write!(f, "mysql"),
            ProviderType::Sqlite => write!(f, "sqlite"),
            ProviderType::Http => write!(f, "http"),
        }
    }
}

impl<'de> Deserialize<'de> for ProviderType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

fn default_read_pool_size() -> u32 {
    4
}

/// Everything needed to build a provider
///
/// ```rust
/// use polyquery::config::{ProviderConfig, ProviderType};
///
/// let config: ProviderConfig = serde_json::from_str(
///     r#"{"type": "sqlite", "url": "sqlite://app.db", "readPoolSize": 2}"#,
/// )
/// .unwrap();
/// assert_eq!(config.provider_type, ProviderType::Sqlite);
/// assert_eq!(config.read_pool_size, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Database URL, or the endpoint for HTTP providers
    pub url: String,
    #[serde(default)]
    pub pool: PoolConfig,
    /// Size of the read pool for single-writer backends
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: u32,
    /// Per-request timeout for HTTP providers
    #[serde(default, rename = "requestTimeoutMs", with = "millis::option")]
    pub request_timeout: Option<Duration>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType, url: &str) -> Self {
        Self {
            provider_type,
            url: url.to_string(),
            pool: PoolConfig::default(),
            read_pool_size: default_read_pool_size(),
            request_timeout: None,
        }
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_read_pool_size(mut self, size: u32) -> Self {
        self.read_pool_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::config("url must not be empty"));
        }
        if self.provider_type == ProviderType::Sqlite && self.read_pool_size == 0 {
            return Err(Error::config("read_pool_size must be at least 1"));
        }
        self.pool.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_aliases() {
        assert_eq!("PostgreSQL".parse::<ProviderType>().unwrap(), ProviderType::Postgres);
        assert_eq!("mariadb".parse::<ProviderType>().unwrap(), ProviderType::MySql);
        assert_eq!("remote".parse::<ProviderType>().unwrap(), ProviderType::Http);
    }

    #[test]
    fn test_unknown_provider_type() {
        let err = "oracle".parse::<ProviderType>().unwrap_err();
        assert!(matches!(err, Error::UnknownProviderType { ref provider_type } if provider_type == "oracle"));
        assert_eq!(err.to_string(), "Unknown provider type 'oracle'");

        let parsed = serde_json::from_str::<ProviderConfig>(r#"{"type": "oracle", "url": "x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "type": "http",
            "url": "https://db.example.com/query",
            "requestTimeoutMs": 1500,
            "pool": { "maxConnections": 3 }
        }))
        .unwrap();
        assert_eq!(config.provider_type, ProviderType::Http);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.pool.max_connections, 3);
        assert_eq!(config.pool.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.read_pool_size, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_delegates_to_pool() {
        let config = ProviderConfig::new(ProviderType::Postgres, "postgres://localhost/app")
            .with_pool(PoolConfig::new().with_max_connections(0));
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
        assert!(ProviderConfig::new(ProviderType::Sqlite, "").validate().is_err());
    }
}
