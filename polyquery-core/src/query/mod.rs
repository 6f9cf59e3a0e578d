//! The backend-agnostic query model
//!
//! A [`Query`] is an immutable value: every builder method consumes the query
//! and returns the updated one, so partially built queries can be cloned and
//! extended independently.

pub mod condition;
pub mod field;
pub mod join;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

pub use condition::{Condition, InSource, IntoCondition};
pub use field::{Aggregate, AggregateFunction, FieldRef, IntoSelections, Selection};
pub use join::{Join, JoinSource, JoinType, OrderBy, SortDirection};

use crate::Value;

/// The statement family a query compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    /// Whether the statement modifies data
    pub fn is_write(&self) -> bool {
        !matches!(self, QueryKind::Select)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Select => write!(f, "SELECT"),
            QueryKind::Insert => write!(f, "INSERT"),
            QueryKind::Update => write!(f, "UPDATE"),
            QueryKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A complete query against one main table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Selection>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<Join>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<FieldRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub having: Option<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub distinct: bool,
}

impl Query {
    fn new(kind: QueryKind, table: &str) -> Self {
        Self {
            kind,
            table: table.to_string(),
            alias: None,
            fields: Vec::new(),
            values: BTreeMap::new(),
            filter: None,
            joins: Vec::new(),
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
        }
    }

    /// Create a new SELECT query; an empty field list selects everything
    pub fn select(table: &str) -> Self {
        Self::new(QueryKind::Select, table)
    }

    /// Create a new INSERT query
    pub fn insert(table: &str) -> Self {
        Self::new(QueryKind::Insert, table)
    }

    /// Create a new UPDATE query
    pub fn update(table: &str) -> Self {
        Self::new(QueryKind::Update, table)
    }

    /// Create a new DELETE query
    pub fn delete(table: &str) -> Self {
        Self::new(QueryKind::Delete, table)
    }

    /// Refer to the main table by another name
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// The name the main table is known by inside the statement
    pub fn source_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table)
    }

    /// Replace the field list
    pub fn fields<S: IntoSelections>(mut self, fields: S) -> Self {
        self.fields = fields.into_selections();
        self
    }

    /// Set one INSERT/UPDATE value, keyed by logical field name
    pub fn value(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    /// Set several INSERT/UPDATE values
    pub fn values<K, V, I>(mut self, values: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        self.values
            .extend(values.into_iter().map(|(field, value)| (field.into(), value.into())));
        self
    }

    /// Add a WHERE condition, combined with any existing one under AND
    pub fn where_<C: IntoCondition>(mut self, condition: C) -> Self {
        let condition = condition.into_condition();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and_also(condition),
            None => condition,
        });
        self
    }

    /// Add a WHERE condition, combined with any existing one under OR
    pub fn or_where<C: IntoCondition>(mut self, condition: C) -> Self {
        let condition = condition.into_condition();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.or_else(condition),
            None => condition,
        });
        self
    }

    /// Add a JOIN clause
    pub fn join<C: IntoCondition>(mut self, kind: JoinType, source: JoinSource, on: C) -> Self {
        self.joins.push(Join::new(kind, source, on.into_condition()));
        self
    }

    /// Add an INNER JOIN clause
    pub fn inner_join<C: IntoCondition>(self, source: JoinSource, on: C) -> Self {
        self.join(JoinType::Inner, source, on)
    }

    /// Add a LEFT JOIN clause
    pub fn left_join<C: IntoCondition>(self, source: JoinSource, on: C) -> Self {
        self.join(JoinType::Left, source, on)
    }

    /// Add a RIGHT JOIN clause
    pub fn right_join<C: IntoCondition>(self, source: JoinSource, on: C) -> Self {
        self.join(JoinType::Right, source, on)
    }

    /// Add a FULL OUTER JOIN clause
    pub fn full_join<C: IntoCondition>(self, source: JoinSource, on: C) -> Self {
        self.join(JoinType::Full, source, on)
    }

    /// Add GROUP BY fields
    pub fn group_by<F: Into<FieldRef>>(mut self, fields: impl IntoIterator<Item = F>) -> Self {
        self.group_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition (requires GROUP BY)
    pub fn having<C: IntoCondition>(mut self, condition: C) -> Self {
        let condition = condition.into_condition();
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and_also(condition),
            None => condition,
        });
        self
    }

    /// Add an ORDER BY entry
    pub fn order_by(mut self, field: impl Into<FieldRef>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Add an ORDER BY ASC entry (convenience method)
    pub fn order_by_asc(self, field: impl Into<FieldRef>) -> Self {
        self.order_by(field, SortDirection::Asc)
    }

    /// Add an ORDER BY DESC entry (convenience method)
    pub fn order_by_desc(self, field: impl Into<FieldRef>) -> Self {
        self.order_by(field, SortDirection::Desc)
    }

    /// Add a LIMIT clause
    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    /// Add an OFFSET clause
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Mark the query as DISTINCT
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Every join type used by this query and any subquery nested in it
    pub fn join_types(&self) -> BTreeSet<JoinType> {
        let mut kinds = BTreeSet::new();
        self.collect_join_types(&mut kinds);
        kinds
    }

    fn collect_join_types(&self, kinds: &mut BTreeSet<JoinType>) {
        let mut visit = |subquery: &Query| subquery.collect_join_types(kinds);
        for join in &self.joins {
            join.on.for_each_subquery(&mut visit);
        }
        for condition in self.filter.iter().chain(self.having.iter()) {
            condition.for_each_subquery(&mut visit);
        }
        kinds.extend(self.joins.iter().map(|join| join.kind));
    }
}

/// Create a JOIN source for a physical table
pub fn table(name: &str) -> JoinSource {
    JoinSource::Table(name.to_string())
}

/// Create a JOIN source for a registered repository
pub fn repository(name: &str) -> JoinSource {
    JoinSource::Repository(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;

    #[test]
    fn test_where_combines_under_and() {
        let query = Query::select("users").where_(("age", op::GT, 18)).where_(("status", "active"));
        assert_eq!(
            query.filter,
            Some(Condition::and([
                Condition::compare("age", op::GT, 18),
                Condition::equals("status", "active"),
            ]))
        );
    }

    #[test]
    fn test_or_where_wraps_existing_filter() {
        let query = Query::select("users").where_(("a", 1)).where_(("b", 2)).or_where(("c", 3));
        match query.filter {
            Some(Condition::Or { conditions }) => {
                assert!(matches!(conditions[0], Condition::And { .. }));
                assert_eq!(conditions.len(), 2);
            }
            other => panic!("expected OR, got {other:?}"),
        }
    }

    #[test]
    fn test_builders_are_immutable_values() {
        let base = Query::select("users").fields(("id", "name"));
        let limited = base.clone().limit(10);
        assert_eq!(base.limit, None);
        assert_eq!(limited.limit, Some(10));
    }

    #[test]
    fn test_join_types_include_subqueries() {
        let inner = Query::select("orders").fields("user_id").full_join(table("refunds"), ("refunds.order_id", 1));
        let query = Query::select("users")
            .left_join(table("profiles"), Condition::equals("profiles.user_id", 1))
            .where_(Condition::in_subquery("id", inner));
        let kinds = query.join_types();
        assert!(kinds.contains(&JoinType::Left));
        assert!(kinds.contains(&JoinType::Full));
        assert_eq!(kinds.len(), 2);
    }

    #[test]
    fn test_kind_is_write() {
        assert!(!QueryKind::Select.is_write());
        assert!(QueryKind::Insert.is_write());
        assert!(QueryKind::Delete.is_write());
    }

    #[test]
    fn test_serialized_shape() {
        let query = Query::select("users").fields("id").where_(("id", 1)).limit(5);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "SELECT",
                "table": "users",
                "fields": ["id"],
                "where": {"type": "compare", "field": "id", "op": "=", "value": 1},
                "limit": 5
            })
        );
    }
}
