//! Backend dialects
//!
//! A [`Dialect`] turns a [`Query`] into what one backend family executes:
//! parameterized SQL for the relational dialects, or a JSON payload for the
//! remote transport. Capability gating happens here, before any connection is
//! involved.

mod mysql;
mod postgres;
mod remote;
mod sql;
mod sqlite;

use std::fmt;

pub use mysql::MySql;
pub use postgres::Postgres;
pub use remote::Remote;
pub use sqlite::Sqlite;

use crate::diagnostic::Diagnostic;
use crate::query::{JoinType, Query, QueryKind};
use crate::resolver::Resolver;
use crate::{Error, Result, Value};

/// What a dialect hands to a provider for execution
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SQL text with positional parameters
    Sql { text: String, params: Vec<Value> },
    /// A structured request body for the remote transport
    Payload(serde_json::Value),
}

/// The output of [`Dialect::compile`]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub kind: QueryKind,
    pub statement: Statement,
    /// Warnings raised while resolving fields; already logged
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledQuery {
    /// The SQL text, if this is a SQL statement
    pub fn sql(&self) -> Option<&str> {
        match &self.statement {
            Statement::Sql { text, .. } => Some(text),
            Statement::Payload(_) => None,
        }
    }

    /// Bound parameters; empty for payload statements
    pub fn params(&self) -> &[Value] {
        match &self.statement {
            Statement::Sql { params, .. } => params,
            Statement::Payload(_) => &[],
        }
    }

    /// The request body, if this is a payload statement
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.statement {
            Statement::Payload(payload) => Some(payload),
            Statement::Sql { .. } => None,
        }
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.statement {
            Statement::Sql { text, .. } => f.write_str(text),
            Statement::Payload(payload) => write!(f, "{payload}"),
        }
    }
}

/// A backend family's compilation rules
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Short name used in errors and logs
    fn name(&self) -> &'static str;

    /// Join types this dialect can express
    fn supported_joins(&self) -> &'static [JoinType];

    fn supports_join(&self, kind: JoinType) -> bool {
        self.supported_joins().contains(&kind)
    }

    /// Fail if the query, or any subquery in it, needs a join type this
    /// dialect lacks
    fn check_capabilities(&self, query: &Query) -> Result<()> {
        match query.join_types().into_iter().find(|kind| !self.supports_join(*kind)) {
            Some(kind) => Err(Error::unsupported(self.name(), format!("{kind} JOIN"))),
            None => Ok(()),
        }
    }

    /// Compile a query; `resolver` carries the registry and the owning
    /// repository's mapper
    fn compile(&self, query: &Query, resolver: &Resolver<'_>) -> Result<CompiledQuery>;
}
