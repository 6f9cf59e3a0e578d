//! JOIN clauses and ordering

use std::fmt;

use serde::Serialize;

use super::condition::Condition;
use super::field::FieldRef;

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub const ALL: [JoinType; 4] = [JoinType::Inner, JoinType::Left, JoinType::Right, JoinType::Full];
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Full => write!(f, "FULL OUTER"),
        }
    }
}

/// What a JOIN pulls in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinSource {
    /// A physical table, used as-is
    Table(String),
    /// A registered repository; its table and field mapper are looked up
    Repository(String),
}

impl JoinSource {
    /// The name this source is known by inside the query
    pub fn name(&self) -> &str {
        match self {
            JoinSource::Table(name) | JoinSource::Repository(name) => name,
        }
    }
}

/// A complete JOIN clause
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    #[serde(rename = "type")]
    pub kind: JoinType,
    pub source: JoinSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub on: Condition,
}

impl Join {
    pub fn new(kind: JoinType, source: JoinSource, on: Condition) -> Self {
        Self {
            kind,
            source,
            alias: None,
            on,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// The name the joined source is known by inside the query
    pub fn name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.source.name())
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// An ORDER BY entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBy {
    pub field: FieldRef,
    pub direction: SortDirection,
}
