//! Error types for query construction and compilation

use thiserror::Error;

/// The main error type for polyquery-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The target dialect cannot express a feature used by the query
    #[error("Dialect '{dialect}' does not support {capability}")]
    UnsupportedCapability {
        dialect: &'static str,
        capability: String,
    },

    /// A repository name that was never registered
    #[error("Repository '{name}' is not registered")]
    RepositoryNotFound { name: String },

    /// The query has a shape no dialect can compile
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for polyquery-core operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new unsupported capability error
    pub fn unsupported(dialect: &'static str, capability: impl Into<String>) -> Self {
        Self::UnsupportedCapability {
            dialect,
            capability: capability.into(),
        }
    }

    /// Create a new repository not found error
    pub fn repository_not_found(name: impl Into<String>) -> Self {
        Self::RepositoryNotFound { name: name.into() }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_capability_error() {
        let err = Error::unsupported("mysql", "FULL JOIN");
        assert!(matches!(err, Error::UnsupportedCapability { .. }));
        assert_eq!(err.to_string(), "Dialect 'mysql' does not support FULL JOIN");
    }

    #[test]
    fn test_repository_not_found_error() {
        let err = Error::repository_not_found("orders");
        assert!(matches!(err, Error::RepositoryNotFound { .. }));
        assert_eq!(err.to_string(), "Repository 'orders' is not registered");
    }

    #[test]
    fn test_invalid_query_error() {
        let err = Error::invalid_query("INSERT requires values");
        assert_eq!(err.to_string(), "Invalid query: INSERT requires values");
    }
}
