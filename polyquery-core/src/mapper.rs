//! Field mappers and the repository registry

use std::collections::{BTreeSet, HashMap};

use crate::{Error, Result};

/// Field names assumed known when a mapper declares no schema
pub const COMMON_FIELDS: &[&str] = &[
    "id",
    "name",
    "title",
    "status",
    "type",
    "email",
    "created_at",
    "updated_at",
    "deleted_at",
    "user_id",
];

/// Translates logical field names to physical column names and back
///
/// Names without an explicit mapping translate to themselves.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    to_physical: HashMap<String, String>,
    to_logical: HashMap<String, String>,
    schema: Option<BTreeSet<String>>,
}

impl FieldMapper {
    /// Create an identity mapper
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a logical field to a physical column
    pub fn map(mut self, logical: &str, physical: &str) -> Self {
        self.to_physical.insert(logical.to_string(), physical.to_string());
        self.to_logical.insert(physical.to_string(), logical.to_string());
        self
    }

    /// Declare the full set of logical fields this repository exposes
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Physical column for a logical field
    pub fn physical<'a>(&'a self, logical: &'a str) -> &'a str {
        self.to_physical.get(logical).map_or(logical, String::as_str)
    }

    /// Logical field for a physical column
    pub fn logical<'a>(&'a self, physical: &'a str) -> &'a str {
        self.to_logical.get(physical).map_or(physical, String::as_str)
    }

    /// Logical fields this mapper is known to expose
    ///
    /// The declared schema when there is one; otherwise every entry of
    /// [`COMMON_FIELDS`], which any mapper translates.
    pub fn known_fields(&self) -> BTreeSet<String> {
        match &self.schema {
            Some(schema) => schema.clone(),
            None => COMMON_FIELDS.iter().map(|field| field.to_string()).collect(),
        }
    }
}

/// A named binding of a physical table plus its field mapper
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    pub name: String,
    pub table: String,
    pub mapper: FieldMapper,
}

/// All repositories known to the resolver and the conflict detector
///
/// Registration happens during startup; once traffic begins the registry is
/// shared immutably (typically behind an `Arc`) and only read.
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    entries: HashMap<String, RepositoryEntry>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository, replacing any previous one of the same name
    pub fn register(&mut self, name: &str, table: &str, mapper: FieldMapper) -> &mut Self {
        self.entries.insert(
            name.to_string(),
            RepositoryEntry {
                name: name.to_string(),
                table: table.to_string(),
                mapper,
            },
        );
        self
    }

    /// Builder-style registration
    pub fn with(mut self, name: &str, table: &str, mapper: FieldMapper) -> Self {
        self.register(name, table, mapper);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.entries.get(name)
    }

    /// Look up a repository that must exist
    pub fn require(&self, name: &str) -> Result<&RepositoryEntry> {
        self.get(name).ok_or_else(|| Error::repository_not_found(name))
    }

    /// Find the repository bound to a physical table
    pub fn find_by_table(&self, table: &str) -> Option<&RepositoryEntry> {
        self.entries.values().find(|entry| entry.table == table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_for_unmapped_fields() {
        let mapper = FieldMapper::new().map("createdAt", "created_at");
        assert_eq!(mapper.physical("createdAt"), "created_at");
        assert_eq!(mapper.physical("status"), "status");
        assert_eq!(mapper.logical("created_at"), "createdAt");
        assert_eq!(mapper.logical("status"), "status");
    }

    #[test]
    fn test_known_fields_prefers_schema() {
        let mapper = FieldMapper::new().map("id", "user_id").with_fields(["id", "nickname"]);
        let known: Vec<_> = mapper.known_fields().into_iter().collect();
        assert_eq!(known, vec!["id", "nickname"]);
    }

    #[test]
    fn test_known_fields_default_to_common_names() {
        let mapper = FieldMapper::new().map("id", "order_id").map("total", "total_cents");
        let known = mapper.known_fields();
        assert_eq!(known.len(), COMMON_FIELDS.len());
        assert!(known.contains("id"));
        assert!(known.contains("user_id"));
        assert!(!known.contains("total"));
        assert_eq!(FieldMapper::new().known_fields(), known);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = RepositoryRegistry::new().with("users", "app_users", FieldMapper::new());
        assert_eq!(registry.require("users").unwrap().table, "app_users");
        assert_eq!(registry.find_by_table("app_users").unwrap().name, "users");
        assert!(matches!(
            registry.require("orders"),
            Err(Error::RepositoryNotFound { .. })
        ));
    }
}
