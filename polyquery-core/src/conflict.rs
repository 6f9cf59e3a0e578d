//! Ambiguous-field detection for joined queries

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostic::Diagnostic;
use crate::mapper::{FieldMapper, RepositoryRegistry};
use crate::query::{JoinSource, Query, Selection};

/// Warns about unqualified fields that more than one joined source exposes
///
/// Purely advisory: the query is never modified and ambiguous fields are
/// still compiled and sent to the backend.
#[derive(Debug, Clone, Copy)]
pub struct ConflictDetector<'a> {
    registry: &'a RepositoryRegistry,
}

impl<'a> ConflictDetector<'a> {
    pub fn new(registry: &'a RepositoryRegistry) -> Self {
        Self { registry }
    }

    /// Inspect `query` and log one warning per ambiguous field
    ///
    /// `main_mapper` is the field mapper of the repository owning the query;
    /// without it the main table's mapper is looked up by table name.
    pub fn detect(&self, query: &Query, main_mapper: Option<&FieldMapper>) -> Vec<Diagnostic> {
        if query.joins.is_empty() {
            return Vec::new();
        }

        let mut owners: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let main_mapper = main_mapper
            .or_else(|| self.registry.find_by_table(&query.table).map(|entry| &entry.mapper));
        let main_source = (query.source_name().to_string(), main_mapper);
        let joined = query.joins.iter().map(|join| {
            let mapper = match &join.source {
                JoinSource::Repository(name) => self.registry.get(name),
                JoinSource::Table(table) => self.registry.find_by_table(table),
            };
            (join.name().to_string(), mapper.map(|entry| &entry.mapper))
        });

        for (source, mapper) in std::iter::once(main_source).chain(joined) {
            let Some(mapper) = mapper else { continue };
            for field in mapper.known_fields() {
                let sources = owners.entry(field).or_default();
                if !sources.contains(&source) {
                    sources.push(source.clone());
                }
            }
        }

        let unqualified: BTreeSet<&str> = if query.fields.is_empty() {
            owners.keys().map(String::as_str).collect()
        } else {
            query
                .fields
                .iter()
                .map(Selection::field)
                .filter(|field| !field.is_qualified())
                .map(|field| field.field_name())
                .collect()
        };

        let diagnostics: Vec<Diagnostic> = owners
            .iter()
            .filter(|(field, sources)| sources.len() > 1 && unqualified.contains(field.as_str()))
            .map(|(field, sources)| Diagnostic::FieldConflict {
                field: field.clone(),
                sources: sources.clone(),
            })
            .collect();

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        diagnostics
    }
}
