//! Field reference resolution
//!
//! Turns a [`FieldRef`] into the (optionally qualified) column name a backend
//! understands, translating logical names through repository field mappers.
//! Resolution is pure: it reads the registry and never performs I/O.

use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::mapper::{FieldMapper, RepositoryRegistry};
use crate::query::FieldRef;

/// A field after resolution: physical column plus optional qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    pub table: Option<String>,
    pub field: String,
}

impl ResolvedField {
    pub fn unqualified(field: impl Into<String>) -> Self {
        Self {
            table: None,
            field: field.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            field: field.into(),
        }
    }
}

impl fmt::Display for ResolvedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.field),
            None => f.write_str(&self.field),
        }
    }
}

/// Resolves field references against a repository registry
///
/// The optional fallback mapper belongs to the repository that owns the query
/// and applies to unqualified fields.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a RepositoryRegistry,
    fallback: Option<&'a FieldMapper>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a RepositoryRegistry) -> Self {
        Self {
            registry,
            fallback: None,
        }
    }

    /// Use `mapper` for unqualified fields
    pub fn with_fallback(mut self, mapper: &'a FieldMapper) -> Self {
        self.fallback = Some(mapper);
        self
    }

    /// A resolver whose fallback is the mapper of the repository bound to
    /// `table`, if any
    pub fn for_table(&self, table: &str) -> Self {
        Self {
            registry: self.registry,
            fallback: self.registry.find_by_table(table).map(|entry| &entry.mapper),
        }
    }

    pub fn registry(&self) -> &'a RepositoryRegistry {
        self.registry
    }

    pub fn fallback(&self) -> Option<&'a FieldMapper> {
        self.fallback
    }

    /// Resolve a field, logging any fallback warning
    pub fn resolve(&self, field: &FieldRef) -> ResolvedField {
        let (resolved, diagnostic) = self.resolve_with_diagnostic(field);
        if let Some(diagnostic) = diagnostic {
            diagnostic.log();
        }
        resolved
    }

    /// Resolve a field, handing any fallback warning back to the caller
    pub fn resolve_with_diagnostic(&self, field: &FieldRef) -> (ResolvedField, Option<Diagnostic>) {
        match field {
            FieldRef::Path(path) => match path.split_once('.') {
                Some((prefix, name)) => {
                    let column = match self.registry.get(prefix) {
                        Some(entry) => entry.mapper.physical(name),
                        None => name,
                    };
                    (ResolvedField::qualified(prefix, column), None)
                }
                None => (self.unqualified(path), None),
            },
            FieldRef::Field(name) => (self.unqualified(name), None),
            FieldRef::Table { table, field } => (ResolvedField::qualified(table, field.as_str()), None),
            FieldRef::Repository { repository, field } => match self.registry.get(repository) {
                Some(entry) => (
                    ResolvedField::qualified(repository, entry.mapper.physical(field)),
                    None,
                ),
                None => (
                    ResolvedField::qualified(repository, field.as_str()),
                    Some(Diagnostic::MappingFallback {
                        repository: repository.clone(),
                        field: field.clone(),
                    }),
                ),
            },
        }
    }

    /// Physical column for an unqualified logical name
    pub fn column(&self, logical: &str) -> String {
        match self.fallback {
            Some(mapper) => mapper.physical(logical).to_string(),
            None => logical.to_string(),
        }
    }

    fn unqualified(&self, logical: &str) -> ResolvedField {
        ResolvedField::unqualified(self.column(logical))
    }
}
