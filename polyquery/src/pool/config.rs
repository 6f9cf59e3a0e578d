//! Pool configuration

use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Sizing and timing for a [`Pool`](super::Pool)
///
/// Deserializes from camelCase keys with durations given in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    #[serde(rename = "acquireTimeoutMs", with = "millis")]
    pub acquire_timeout: Duration,
    #[serde(rename = "idleTimeoutMs", with = "millis::option")]
    pub idle_timeout: Option<Duration>,
    /// Open connections when the pool is built instead of on first use
    pub pre_connect: bool,
    /// How many connections pre-warming opens; `min_connections` when unset
    pub warm_target: Option<u32>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            pre_connect: false,
            warm_target: None,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values
    ///
    /// # Examples
    ///
    /// ```rust
    /// use polyquery::pool::PoolConfig;
    ///
    /// let config = PoolConfig::new().with_max_connections(4);
    /// assert_eq!(config.max_connections, 4);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_pre_connect(mut self, pre_connect: bool) -> Self {
        self.pre_connect = pre_connect;
        self
    }

    pub fn with_warm_target(mut self, target: u32) -> Self {
        self.warm_target = Some(target);
        self
    }

    /// Number of connections pre-warming opens
    pub fn warm_count(&self) -> u32 {
        self.warm_target.unwrap_or(self.min_connections).min(self.max_connections)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(Error::config("max_connections must be at least 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(Error::config("max_connections must be >= min_connections"));
        }
        if self.acquire_timeout.is_zero() {
            return Err(Error::config("acquire_timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Serde helpers for durations expressed in milliseconds
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
            Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
        }
    }
}
