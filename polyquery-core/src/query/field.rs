//! Field references, aggregates and field-list entries

use std::fmt;

use serde::{Serialize, Serializer};

/// Identifies a field, optionally qualified by a table or a repository
///
/// `Path` is the string form and may carry a `prefix.` that is resolved
/// against the repository registry. The other variants are the structured
/// form; at most one qualifier exists by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// `"status"` or `"prefix.field"`
    Path(String),
    /// Structured reference with no qualifier
    Field(String),
    /// Physical table qualifier, used verbatim
    Table { table: String, field: String },
    /// Repository qualifier, translated through that repository's mapper
    Repository { repository: String, field: String },
}

impl FieldRef {
    /// Whether this reference names its table or repository
    pub fn is_qualified(&self) -> bool {
        match self {
            FieldRef::Path(path) => path.contains('.'),
            FieldRef::Field(_) => false,
            FieldRef::Table { .. } | FieldRef::Repository { .. } => true,
        }
    }

    /// The field part, without any qualifier
    pub fn field_name(&self) -> &str {
        match self {
            FieldRef::Path(path) => path.split_once('.').map_or(path.as_str(), |(_, field)| field),
            FieldRef::Field(field) => field,
            FieldRef::Table { field, .. } | FieldRef::Repository { field, .. } => field,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Path(path) => f.write_str(path),
            FieldRef::Field(field) => f.write_str(field),
            FieldRef::Table { table: prefix, field } | FieldRef::Repository { repository: prefix, field } => {
                write!(f, "{prefix}.{field}")
            }
        }
    }
}

// The wire form of a field reference is its canonical "prefix.field" string.
impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<&str> for FieldRef {
    fn from(path: &str) -> Self {
        FieldRef::Path(path.to_string())
    }
}

impl From<String> for FieldRef {
    fn from(path: String) -> Self {
        FieldRef::Path(path)
    }
}

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

/// An aggregate over a single field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub function: AggregateFunction,
    pub field: FieldRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub distinct: bool,
}

impl Aggregate {
    pub fn new(function: AggregateFunction, field: impl Into<FieldRef>) -> Self {
        Self {
            function,
            field: field.into(),
            alias: None,
            distinct: false,
        }
    }

    /// Create a COUNT(field) aggregate; use `"*"` to count rows
    pub fn count(field: impl Into<FieldRef>) -> Self {
        Self::new(AggregateFunction::Count, field)
    }

    /// Create a SUM(field) aggregate
    pub fn sum(field: impl Into<FieldRef>) -> Self {
        Self::new(AggregateFunction::Sum, field)
    }

    /// Create an AVG(field) aggregate
    pub fn avg(field: impl Into<FieldRef>) -> Self {
        Self::new(AggregateFunction::Avg, field)
    }

    /// Create a MIN(field) aggregate
    pub fn min(field: impl Into<FieldRef>) -> Self {
        Self::new(AggregateFunction::Min, field)
    }

    /// Create a MAX(field) aggregate
    pub fn max(field: impl Into<FieldRef>) -> Self {
        Self::new(AggregateFunction::Max, field)
    }

    /// Aggregate over distinct values only
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add alias to this aggregate
    pub fn as_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }
}

/// One entry of a SELECT field list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Selection {
    Field(FieldRef),
    Aggregate(Aggregate),
}

impl Selection {
    /// The field reference this entry reads
    pub fn field(&self) -> &FieldRef {
        match self {
            Selection::Field(field) => field,
            Selection::Aggregate(aggregate) => &aggregate.field,
        }
    }
}

impl From<FieldRef> for Selection {
    fn from(field: FieldRef) -> Self {
        Selection::Field(field)
    }
}

impl From<&str> for Selection {
    fn from(path: &str) -> Self {
        Selection::Field(FieldRef::from(path))
    }
}

impl From<String> for Selection {
    fn from(path: String) -> Self {
        Selection::Field(FieldRef::Path(path))
    }
}

impl From<Aggregate> for Selection {
    fn from(aggregate: Aggregate) -> Self {
        Selection::Aggregate(aggregate)
    }
}

/// Trait to convert various types into field lists
pub trait IntoSelections {
    fn into_selections(self) -> Vec<Selection>;
}

impl IntoSelections for &str {
    fn into_selections(self) -> Vec<Selection> {
        vec![Selection::from(self)]
    }
}

impl IntoSelections for FieldRef {
    fn into_selections(self) -> Vec<Selection> {
        vec![Selection::Field(self)]
    }
}

impl IntoSelections for Aggregate {
    fn into_selections(self) -> Vec<Selection> {
        vec![Selection::Aggregate(self)]
    }
}

impl<T: Into<Selection>> IntoSelections for Vec<T> {
    fn into_selections(self) -> Vec<Selection> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<A: Into<Selection>, B: Into<Selection>> IntoSelections for (A, B) {
    fn into_selections(self) -> Vec<Selection> {
        vec![self.0.into(), self.1.into()]
    }
}

impl<A: Into<Selection>, B: Into<Selection>, C: Into<Selection>> IntoSelections for (A, B, C) {
    fn into_selections(self) -> Vec<Selection> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}

impl<A, B, C, D> IntoSelections for (A, B, C, D)
where
    A: Into<Selection>,
    B: Into<Selection>,
    C: Into<Selection>,
    D: Into<Selection>,
{
    fn into_selections(self) -> Vec<Selection> {
        vec![self.0.into(), self.1.into(), self.2.into(), self.3.into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualification() {
        assert!(!FieldRef::from("status").is_qualified());
        assert!(FieldRef::from("orders.status").is_qualified());
        assert!(!FieldRef::Field("a.b".into()).is_qualified());
        assert!(FieldRef::Table { table: "t".into(), field: "f".into() }.is_qualified());
    }

    #[test]
    fn test_field_name_strips_prefix() {
        assert_eq!(FieldRef::from("orders.status").field_name(), "status");
        assert_eq!(
            FieldRef::Repository { repository: "r".into(), field: "x".into() }.field_name(),
            "x"
        );
    }

    #[test]
    fn test_serializes_to_canonical_string() {
        let field = FieldRef::Table { table: "users".into(), field: "id".into() };
        assert_eq!(serde_json::to_value(&field).unwrap(), serde_json::json!("users.id"));
    }

    #[test]
    fn test_mixed_selection_tuple() {
        let fields = ("department", Aggregate::count("*").as_alias("total")).into_selections();
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[1], Selection::Aggregate(_)));
    }
}
