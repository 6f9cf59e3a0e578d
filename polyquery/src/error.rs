//! Error types for pooling, providers and execution

use std::time::Duration;

use thiserror::Error;

/// The main error type for polyquery operations
#[derive(Error, Debug)]
pub enum Error {
    /// Compilation or query-model error; raised before any connection is used
    #[error(transparent)]
    Query(#[from] polyquery_core::Error),

    /// No connection became available within the acquire timeout
    #[error("Timed out after {timeout:?} waiting for a connection")]
    AcquireTimeout { timeout: Duration },

    /// The pool is draining or closed
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The provider has not been connected yet, or was disconnected
    #[error("Provider is not connected")]
    NotConnected,

    /// Provider configuration named a backend type that does not exist
    #[error("Unknown provider type '{provider_type}'")]
    UnknownProviderType { provider_type: String },

    /// Invalid pool or provider configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Driver error from sqlx, passed through unchanged
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP transport error
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote store reported a failure
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for polyquery operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new unknown provider type error
    pub fn unknown_provider_type(provider_type: impl Into<String>) -> Self {
        Self::UnknownProviderType {
            provider_type: provider_type.into(),
        }
    }

    /// Create a new remote error
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::AcquireTimeout { .. })
    }
}
