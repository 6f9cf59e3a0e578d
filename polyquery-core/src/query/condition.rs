//! Filter conditions

use serde::Serialize;

use super::field::FieldRef;
use super::Query;
use crate::{Operator, Value};

/// Right-hand side of an `IN` / `NOT IN` test
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InSource {
    Values(Vec<Value>),
    Subquery(Box<Query>),
}

/// A filter condition
///
/// Leaves test a single field; `And`, `Or` and `Not` nest to any depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Condition {
    Compare {
        field: FieldRef,
        op: Operator,
        value: Value,
    },
    /// Field-to-field comparison, the usual shape of a JOIN ... ON
    Columns {
        left: FieldRef,
        op: Operator,
        right: FieldRef,
    },
    In {
        field: FieldRef,
        negated: bool,
        source: InSource,
    },
    Null {
        field: FieldRef,
        negated: bool,
    },
    Between {
        field: FieldRef,
        low: Value,
        high: Value,
    },
    Like {
        field: FieldRef,
        pattern: String,
    },
    And {
        conditions: Vec<Condition>,
    },
    Or {
        conditions: Vec<Condition>,
    },
    Not {
        condition: Box<Condition>,
    },
}

impl Condition {
    pub fn compare(field: impl Into<FieldRef>, op: Operator, value: impl Into<Value>) -> Self {
        Condition::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<FieldRef>, value: impl Into<Value>) -> Self {
        Self::compare(field, Operator::Eq, value)
    }

    /// Compare two fields, e.g. `orders.user_id = users.id`
    pub fn columns(left: impl Into<FieldRef>, op: Operator, right: impl Into<FieldRef>) -> Self {
        Condition::Columns {
            left: left.into(),
            op,
            right: right.into(),
        }
    }

    pub fn columns_eq(left: impl Into<FieldRef>, right: impl Into<FieldRef>) -> Self {
        Self::columns(left, Operator::Eq, right)
    }

    /// `field IN (values...)`
    pub fn in_values<V: Into<Value>>(field: impl Into<FieldRef>, values: impl IntoIterator<Item = V>) -> Self {
        Condition::In {
            field: field.into(),
            negated: false,
            source: InSource::Values(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `field NOT IN (values...)`
    pub fn not_in_values<V: Into<Value>>(field: impl Into<FieldRef>, values: impl IntoIterator<Item = V>) -> Self {
        Condition::In {
            field: field.into(),
            negated: true,
            source: InSource::Values(values.into_iter().map(Into::into).collect()),
        }
    }

    /// `field IN (SELECT ...)`
    pub fn in_subquery(field: impl Into<FieldRef>, subquery: Query) -> Self {
        Condition::In {
            field: field.into(),
            negated: false,
            source: InSource::Subquery(Box::new(subquery)),
        }
    }

    /// `field NOT IN (SELECT ...)`
    pub fn not_in_subquery(field: impl Into<FieldRef>, subquery: Query) -> Self {
        Condition::In {
            field: field.into(),
            negated: true,
            source: InSource::Subquery(Box::new(subquery)),
        }
    }

    pub fn is_null(field: impl Into<FieldRef>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: false,
        }
    }

    pub fn is_not_null(field: impl Into<FieldRef>) -> Self {
        Condition::Null {
            field: field.into(),
            negated: true,
        }
    }

    pub fn between(field: impl Into<FieldRef>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Condition::Between {
            field: field.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn like(field: impl Into<FieldRef>, pattern: impl Into<String>) -> Self {
        Condition::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or {
            conditions: conditions.into_iter().collect(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }

    /// Combine with another condition under AND, flattening an existing AND
    pub fn and_also(self, other: Condition) -> Self {
        match self {
            Condition::And { mut conditions } => {
                conditions.push(other);
                Condition::And { conditions }
            }
            first => Condition::and([first, other]),
        }
    }

    /// Combine with another condition under OR, flattening an existing OR
    pub fn or_else(self, other: Condition) -> Self {
        match self {
            Condition::Or { mut conditions } => {
                conditions.push(other);
                Condition::Or { conditions }
            }
            first => Condition::or([first, other]),
        }
    }

    /// Visit every field reference in this condition, descending into
    /// combinators but not into subqueries
    pub fn for_each_field<'a>(&'a self, visit: &mut impl FnMut(&'a FieldRef)) {
        match self {
            Condition::Compare { field, .. }
            | Condition::In { field, .. }
            | Condition::Null { field, .. }
            | Condition::Between { field, .. }
            | Condition::Like { field, .. } => visit(field),
            Condition::Columns { left, right, .. } => {
                visit(left);
                visit(right);
            }
            Condition::And { conditions } | Condition::Or { conditions } => {
                for condition in conditions {
                    condition.for_each_field(visit);
                }
            }
            Condition::Not { condition } => condition.for_each_field(visit),
        }
    }

    /// Visit every subquery nested anywhere in this condition
    pub fn for_each_subquery<'a>(&'a self, visit: &mut impl FnMut(&'a Query)) {
        match self {
            Condition::In {
                source: InSource::Subquery(subquery),
                ..
            } => visit(subquery),
            Condition::And { conditions } | Condition::Or { conditions } => {
                for condition in conditions {
                    condition.for_each_subquery(visit);
                }
            }
            Condition::Not { condition } => condition.for_each_subquery(visit),
            _ => {}
        }
    }
}

/// Trait for values that can be used as filter conditions
pub trait IntoCondition {
    fn into_condition(self) -> Condition;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Condition {
        self
    }
}

// Shorthand equality: filter(("age", 18))
impl<T> IntoCondition for (&str, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> Condition {
        Condition::equals(self.0, self.1)
    }
}

// Explicit operators: filter(("age", op::GT, 18))
impl<T> IntoCondition for (&str, Operator, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> Condition {
        Condition::compare(self.0, self.1, self.2)
    }
}

impl<T> IntoCondition for (FieldRef, Operator, T)
where
    T: Into<Value>,
{
    fn into_condition(self) -> Condition {
        Condition::compare(self.0, self.1, self.2)
    }
}
