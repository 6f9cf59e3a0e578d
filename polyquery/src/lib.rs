//! Polyquery - one query model, many backends, managed connections
//!
//! Queries are built and compiled by [`polyquery_core`]; this crate adds the
//! connection side: a generic pool, the strategies built on it, providers for
//! sqlx and HTTP backends, and a repository facade tying them together.

pub mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod repository;
pub mod strategy;

#[cfg(test)]
mod testing;

// Re-export main types
pub use backend::{AnyProvider, Backend, Execute, Provider, QueryOutcome, Row};
pub use config::{ProviderConfig, ProviderType};
pub use error::{Error, Result};
pub use pool::{ManageConnection, Pool, PoolConfig, PoolState, PoolStatus, PooledConnection};
pub use repository::Repository;
pub use strategy::{AccessMode, ConnectionStrategy, Lease, SingleWriterPool, SymmetricPool, UnpooledTransport};

pub use polyquery_core::{
    delete, from, insert, op, repo_field, table_field, update,
    CompiledQuery, Condition, Diagnostic, Dialect, FieldMapper, FieldRef, JoinType, Operator, Query,
    QueryKind, RepositoryRegistry, Statement, Value,
};
