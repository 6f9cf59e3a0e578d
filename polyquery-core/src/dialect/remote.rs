use std::collections::BTreeMap;

use super::{CompiledQuery, Dialect, Statement};
use crate::diagnostic::Diagnostic;
use crate::query::{Condition, FieldRef, InSource, JoinSource, JoinType, OrderBy, Query, Selection};
use crate::resolver::Resolver;
use crate::Result;

/// HTTP-fronted stores that receive the query itself as JSON
///
/// Nothing is compiled to SQL. Every field reference is resolved and
/// rewritten to its canonical `table.field` string, value keys are mapped to
/// physical columns, repository joins name their physical table aliased by
/// the repository, and the normalized query is serialized as the payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Remote;

impl Dialect for Remote {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn supported_joins(&self) -> &'static [JoinType] {
        &JoinType::ALL
    }

    fn compile(&self, query: &Query, resolver: &Resolver<'_>) -> Result<CompiledQuery> {
        self.check_capabilities(query)?;

        let mut normalizer = Normalizer {
            diagnostics: Vec::new(),
        };
        let normalized = normalizer.query(query, resolver)?;
        let payload = serde_json::to_value(&normalized)?;

        Ok(CompiledQuery {
            kind: query.kind,
            statement: Statement::Payload(payload),
            diagnostics: normalizer.diagnostics,
        })
    }
}

struct Normalizer {
    diagnostics: Vec<Diagnostic>,
}

impl Normalizer {
    fn query(&mut self, query: &Query, resolver: &Resolver<'_>) -> Result<Query> {
        let mut normalized = query.clone();

        normalized.fields = query
            .fields
            .iter()
            .map(|selection| match selection {
                Selection::Field(field) => Selection::Field(self.field(field, resolver)),
                Selection::Aggregate(aggregate) => {
                    let mut aggregate = aggregate.clone();
                    aggregate.field = self.field(&aggregate.field, resolver);
                    Selection::Aggregate(aggregate)
                }
            })
            .collect();

        normalized.values = query
            .values
            .iter()
            .map(|(key, value)| (resolver.column(key), value.clone()))
            .collect::<BTreeMap<_, _>>();

        normalized.filter = query
            .filter
            .as_ref()
            .map(|filter| self.condition(filter, resolver))
            .transpose()?;
        normalized.having = query
            .having
            .as_ref()
            .map(|having| self.condition(having, resolver))
            .transpose()?;
        for join in &mut normalized.joins {
            if let JoinSource::Repository(name) = &join.source {
                let table = resolver.registry().require(name)?.table.clone();
                if table != *name {
                    join.alias = Some(name.clone());
                }
                join.source = JoinSource::Table(table);
            }
            join.on = self.condition(&join.on, resolver)?;
        }
        normalized.group_by = query.group_by.iter().map(|field| self.field(field, resolver)).collect();
        normalized.order_by = query
            .order_by
            .iter()
            .map(|order| OrderBy {
                field: self.field(&order.field, resolver),
                direction: order.direction,
            })
            .collect();

        Ok(normalized)
    }

    fn condition(&mut self, condition: &Condition, resolver: &Resolver<'_>) -> Result<Condition> {
        Ok(match condition {
            Condition::Compare { field, op, value } => Condition::Compare {
                field: self.field(field, resolver),
                op: *op,
                value: value.clone(),
            },
            Condition::Columns { left, op, right } => Condition::Columns {
                left: self.field(left, resolver),
                op: *op,
                right: self.field(right, resolver),
            },
            Condition::In { field, negated, source } => Condition::In {
                field: self.field(field, resolver),
                negated: *negated,
                source: match source {
                    InSource::Values(values) => InSource::Values(values.clone()),
                    InSource::Subquery(subquery) => {
                        let nested = resolver.for_table(&subquery.table);
                        InSource::Subquery(Box::new(self.query(subquery, &nested)?))
                    }
                },
            },
            Condition::Null { field, negated } => Condition::Null {
                field: self.field(field, resolver),
                negated: *negated,
            },
            Condition::Between { field, low, high } => Condition::Between {
                field: self.field(field, resolver),
                low: low.clone(),
                high: high.clone(),
            },
            Condition::Like { field, pattern } => Condition::Like {
                field: self.field(field, resolver),
                pattern: pattern.clone(),
            },
            Condition::And { conditions } => Condition::And {
                conditions: conditions
                    .iter()
                    .map(|c| self.condition(c, resolver))
                    .collect::<Result<_>>()?,
            },
            Condition::Or { conditions } => Condition::Or {
                conditions: conditions
                    .iter()
                    .map(|c| self.condition(c, resolver))
                    .collect::<Result<_>>()?,
            },
            Condition::Not { condition } => Condition::Not {
                condition: Box::new(self.condition(condition, resolver)?),
            },
        })
    }

    fn field(&mut self, field: &FieldRef, resolver: &Resolver<'_>) -> FieldRef {
        let (resolved, diagnostic) = resolver.resolve_with_diagnostic(field);
        if let Some(diagnostic) = diagnostic {
            diagnostic.log();
            self.diagnostics.push(diagnostic);
        }
        FieldRef::Path(resolved.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{FieldMapper, RepositoryRegistry};
    use crate::query::{repository, Aggregate};
    use crate::query::QueryKind;
    use serde_json::json;

    #[test]
    fn test_payload_has_canonical_field_strings() {
        let registry = RepositoryRegistry::new()
            .with("orders", "shop_orders", FieldMapper::new().map("userId", "user_id"));
        let mapper = FieldMapper::new().map("createdAt", "created_at");
        let resolver = Resolver::new(&registry).with_fallback(&mapper);

        let query = Query::select("users")
            .fields((
                FieldRef::Table {
                    table: "users".into(),
                    field: "id".into(),
                },
                Aggregate::count("orders.userId").as_alias("orders"),
            ))
            .full_join(repository("orders"), Condition::columns_eq("orders.userId", "users.id"))
            .where_(("createdAt", "2024-01-01"))
            .group_by(["users.id"]);

        let compiled = Remote.compile(&query, &resolver).unwrap();
        assert_eq!(compiled.kind, QueryKind::Select);
        assert!(compiled.sql().is_none());
        assert_eq!(
            compiled.payload(),
            Some(&json!({
                "type": "SELECT",
                "table": "users",
                "fields": [
                    "users.id",
                    {"function": "COUNT", "field": "orders.user_id", "alias": "orders", "distinct": false}
                ],
                "where": {"type": "compare", "field": "created_at", "op": "=", "value": "2024-01-01"},
                "joins": [{
                    "type": "FULL",
                    "source": {"table": "shop_orders"},
                    "alias": "orders",
                    "on": {"type": "columns", "left": "orders.user_id", "op": "=", "right": "users.id"}
                }],
                "groupBy": ["users.id"]
            }))
        );
    }

    #[test]
    fn test_unregistered_join_repository_fails() {
        let registry = RepositoryRegistry::new();
        let query = Query::select("users")
            .inner_join(repository("orders"), Condition::columns_eq("orders.user_id", "users.id"));
        let result = Remote.compile(&query, &Resolver::new(&registry));
        assert!(matches!(result, Err(crate::Error::RepositoryNotFound { .. })));
    }

    #[test]
    fn test_values_are_keyed_by_physical_column() {
        let registry = RepositoryRegistry::new();
        let mapper = FieldMapper::new().map("displayName", "display_name");
        let resolver = Resolver::new(&registry).with_fallback(&mapper);
        let query = Query::insert("users").value("displayName", "Ada");
        let compiled = Remote.compile(&query, &resolver).unwrap();
        assert_eq!(
            compiled.payload(),
            Some(&json!({"type": "INSERT", "table": "users", "values": {"display_name": "Ada"}}))
        );
    }

    #[test]
    fn test_subqueries_travel_intact() {
        let registry = RepositoryRegistry::new().with(
            "orders",
            "orders",
            FieldMapper::new().map("userId", "user_id"),
        );
        let resolver = Resolver::new(&registry);
        let inner = Query::select("orders").fields("userId");
        let query = Query::select("users").where_(Condition::in_subquery("id", inner));
        let compiled = Remote.compile(&query, &resolver).unwrap();
        let payload = compiled.payload().unwrap();
        assert_eq!(
            payload["where"]["source"]["subquery"]["fields"],
            json!(["user_id"])
        );
    }
}
