//! Repository facade: queries scoped to one registered repository

use std::sync::Arc;

use polyquery_core::{CompiledQuery, ConflictDetector, FieldMapper, Query, RepositoryEntry, RepositoryRegistry, Resolver};
use serde::de::DeserializeOwned;

use crate::backend::{Provider, QueryOutcome, Row};
use crate::{Error, Result};

/// Builds, compiles and runs queries for one repository
///
/// Unqualified fields go through the repository's field mapper, and result
/// rows come back keyed by logical field names.
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use polyquery::config::{ProviderConfig, ProviderType};
/// use polyquery::{op, AnyProvider, FieldMapper, Provider, Repository, RepositoryRegistry};
///
/// # async fn run() -> polyquery::Result<()> {
/// let registry = Arc::new(
///     RepositoryRegistry::new().with("users", "app_users", FieldMapper::new().map("createdAt", "created_at")),
/// );
/// let provider = Arc::new(AnyProvider::from_config(&ProviderConfig::new(
///     ProviderType::Sqlite,
///     "sqlite://app.db",
/// ))?);
/// provider.connect().await?;
///
/// let users = Repository::new("users", registry, provider)?;
/// let rows: Vec<serde_json::Value> = users
///     .fetch_all(&users.select().where_(("createdAt", op::GT, "2024-01-01")))
///     .await?;
/// # let _ = rows;
/// # Ok(())
/// # }
/// ```
pub struct Repository<P: Provider> {
    entry: RepositoryEntry,
    registry: Arc<RepositoryRegistry>,
    provider: Arc<P>,
}

impl<P: Provider> Repository<P> {
    /// Bind to the repository registered as `name`
    pub fn new(name: &str, registry: Arc<RepositoryRegistry>, provider: Arc<P>) -> Result<Self> {
        let entry = registry.require(name)?.clone();
        Ok(Self {
            entry,
            registry,
            provider,
        })
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn table(&self) -> &str {
        &self.entry.table
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.entry.mapper
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// A SELECT on this repository's table
    ///
    /// Aliased with the repository name when it differs from the table, so
    /// `name.field` references resolve against it.
    pub fn select(&self) -> Query {
        self.aliased(Query::select(&self.entry.table))
    }

    pub fn insert(&self) -> Query {
        Query::insert(&self.entry.table)
    }

    /// An UPDATE on this repository's table; `name.field` works as in [`select`](Self::select)
    pub fn update(&self) -> Query {
        self.aliased(Query::update(&self.entry.table))
    }

    pub fn delete(&self) -> Query {
        self.aliased(Query::delete(&self.entry.table))
    }

    fn aliased(&self, query: Query) -> Query {
        if self.entry.name != self.entry.table {
            query.alias(&self.entry.name)
        } else {
            query
        }
    }

    /// Check `query` for ambiguous fields and compile it for the provider
    pub fn compile(&self, query: &Query) -> Result<CompiledQuery> {
        let conflicts = ConflictDetector::new(&self.registry).detect(query, Some(&self.entry.mapper));
        let resolver = Resolver::new(&self.registry).with_fallback(&self.entry.mapper);
        let mut compiled = self.provider.dialect().compile(query, &resolver)?;
        compiled.diagnostics.extend(conflicts);
        Ok(compiled)
    }

    /// Compile and run `query`; rows keep their physical column names
    pub async fn execute(&self, query: &Query) -> Result<QueryOutcome> {
        let compiled = self.compile(query)?;
        self.provider.execute_compiled(&compiled).await
    }

    /// Run `query` and deserialize each row, keyed by logical field names
    pub async fn fetch_all<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        let outcome = self.execute(query).await?;
        outcome
            .rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(serde_json::Value::Object(self.to_logical(row))).map_err(Error::from)
            })
            .collect()
    }

    fn to_logical(&self, row: Row) -> Row {
        row.into_iter()
            .map(|(column, value)| (self.entry.mapper.logical(&column).to_string(), value))
            .collect()
    }
}

impl<P: Provider> std::fmt::Debug for Repository<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.entry.name)
            .field("table", &self.entry.table)
            .finish()
    }
}
