//! Non-fatal findings produced while resolving and checking queries

use std::fmt;

/// A warning that never changes the outcome of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A repository-qualified field named a repository that is not registered;
    /// the literal field name was used instead
    MappingFallback { repository: String, field: String },
    /// An unqualified field exists in more than one source of a joined query
    FieldConflict { field: String, sources: Vec<String> },
}

impl Diagnostic {
    /// Emit this diagnostic through `tracing`
    pub fn log(&self) {
        match self {
            Diagnostic::MappingFallback { repository, field } => {
                tracing::warn!(%repository, %field, "{}", self);
            }
            Diagnostic::FieldConflict { field, sources } => {
                tracing::warn!(%field, sources = ?sources, "{}", self);
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MappingFallback { repository, field } => write!(
                f,
                "repository '{repository}' is not registered; using '{field}' without field mapping"
            ),
            Diagnostic::FieldConflict { field, sources } => write!(
                f,
                "field '{field}' is ambiguous across {}; qualify it with a table, e.g. '{}.{field}'",
                sources.join(", "),
                sources.first().map_or("table", String::as_str),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_suggests_qualification() {
        let diagnostic = Diagnostic::FieldConflict {
            field: "id".into(),
            sources: vec!["users".into(), "orders".into()],
        };
        assert_eq!(
            diagnostic.to_string(),
            "field 'id' is ambiguous across users, orders; qualify it with a table, e.g. 'users.id'"
        );
    }
}
