//! Polyquery Core - a portable query model and its dialect compilers
//!
//! This crate holds everything that does not touch a connection: the query
//! AST, field mappers and the repository registry, field resolution, join
//! conflict detection, and one compiler per backend family.

pub mod conflict;
pub mod diagnostic;
pub mod dialect;
pub mod error;
pub mod mapper;
pub mod operator;
pub mod query;
pub mod resolver;
pub mod value;

// Re-export main types
pub use conflict::ConflictDetector;
pub use diagnostic::Diagnostic;
pub use dialect::{CompiledQuery, Dialect, MySql, Postgres, Remote, Sqlite, Statement};
pub use error::{Error, Result};
pub use mapper::{FieldMapper, RepositoryEntry, RepositoryRegistry};
pub use operator::{op, Operator};
pub use query::{
    repository, table, Aggregate, AggregateFunction, Condition, FieldRef, InSource, IntoCondition,
    IntoSelections, Join, JoinSource, JoinType, OrderBy, Query, QueryKind, Selection, SortDirection,
};
pub use resolver::{ResolvedField, Resolver};
pub use value::Value;

/// Create a new SELECT query for the given table
pub fn from(table: &str) -> Query {
    Query::select(table)
}

/// Create a new INSERT query for the given table
pub fn insert(table: &str) -> Query {
    Query::insert(table)
}

/// Create a new UPDATE query for the given table
pub fn update(table: &str) -> Query {
    Query::update(table)
}

/// Create a new DELETE query for the given table
pub fn delete(table: &str) -> Query {
    Query::delete(table)
}

/// A field qualified by a physical table, used verbatim
///
/// # Examples
///
/// ```
/// use polyquery_core::{from, table_field};
///
/// let query = from("users").fields(table_field("users", "id"));
/// assert!(query.fields[0].field().is_qualified());
/// ```
pub fn table_field(table: &str, field: &str) -> FieldRef {
    FieldRef::Table {
        table: table.to_string(),
        field: field.to_string(),
    }
}

/// A field qualified by a repository, translated through its mapper
pub fn repo_field(repository: &str, field: &str) -> FieldRef {
    FieldRef::Repository {
        repository: repository.to_string(),
        field: field.to_string(),
    }
}
