use super::sql::{self, Placeholder, SqlSyntax};
use super::{CompiledQuery, Dialect};
use crate::query::{JoinType, Query};
use crate::resolver::Resolver;
use crate::Result;

const SYNTAX: SqlSyntax = SqlSyntax {
    name: "postgres",
    placeholder: Placeholder::Numbered,
    unbounded_limit: None,
};

/// PostgreSQL: numbered placeholders, every join type
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        SYNTAX.name
    }

    fn supported_joins(&self) -> &'static [JoinType] {
        &JoinType::ALL
    }

    fn compile(&self, query: &Query, resolver: &Resolver<'_>) -> Result<CompiledQuery> {
        self.check_capabilities(query)?;
        sql::compile(&SYNTAX, query, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostic;
    use crate::mapper::{FieldMapper, RepositoryRegistry};
    use crate::query::{repository, table, Aggregate, Condition, FieldRef};
    use crate::{op, Error, Value};

    fn compile(query: &Query) -> CompiledQuery {
        let registry = RepositoryRegistry::new();
        Postgres.compile(query, &Resolver::new(&registry)).unwrap()
    }

    #[test]
    fn test_select_with_where_and_pagination() {
        let query = Query::select("users")
            .fields(("id", "name"))
            .where_(("age", op::GT, 18))
            .where_(("status", "active"))
            .order_by_desc("created_at")
            .limit(10)
            .offset(20);
        let compiled = compile(&query);
        assert_eq!(
            compiled.sql(),
            Some("SELECT id, name FROM users WHERE (age > $1 AND status = $2) ORDER BY created_at DESC LIMIT 10 OFFSET 20")
        );
        assert_eq!(compiled.params(), &[Value::I32(18), Value::String("active".into())]);
    }

    #[test]
    fn test_combinators_are_fully_parenthesized() {
        let query = Query::select("t").where_(Condition::or([
            Condition::and([Condition::equals("a", 1), Condition::equals("b", 2)]),
            Condition::equals("c", 3),
        ]));
        assert_eq!(
            compile(&query).sql(),
            Some("SELECT * FROM t WHERE ((a = $1 AND b = $2) OR c = $3)")
        );
    }

    #[test]
    fn test_not_and_empty_groups() {
        let query = Query::select("t").where_(Condition::and([
            Condition::not(Condition::like("name", "a%")),
            Condition::or([]),
            Condition::and([]),
        ]));
        assert_eq!(
            compile(&query).sql(),
            Some("SELECT * FROM t WHERE (NOT (name LIKE $1) AND 1 = 0 AND 1 = 1)")
        );
    }

    #[test]
    fn test_in_lists_and_ranges() {
        let query = Query::select("t")
            .where_(Condition::in_values("id", [1, 2, 3]))
            .where_(Condition::not_in_values("id", Vec::<i32>::new()))
            .where_(Condition::between("age", 18, 65))
            .where_(Condition::is_not_null("email"));
        let compiled = compile(&query);
        assert_eq!(
            compiled.sql(),
            Some("SELECT * FROM t WHERE (id IN ($1, $2, $3) AND 1 = 1 AND age BETWEEN $4 AND $5 AND email IS NOT NULL)")
        );
        assert_eq!(compiled.params().len(), 5);
    }

    #[test]
    fn test_null_comparison_becomes_null_test() {
        let query = Query::select("t").where_(("deleted_at", Value::Null));
        assert_eq!(compile(&query).sql(), Some("SELECT * FROM t WHERE deleted_at IS NULL"));
    }

    #[test]
    fn test_subquery_shares_parameter_numbering() {
        let inner = Query::select("orders").fields("user_id").where_(("total", op::GT, 100));
        let query = Query::select("users")
            .where_(("active", true))
            .where_(Condition::in_subquery("id", inner));
        let compiled = compile(&query);
        assert_eq!(
            compiled.sql(),
            Some("SELECT * FROM users WHERE (active = $1 AND id IN (SELECT user_id FROM orders WHERE total > $2))")
        );
        assert_eq!(compiled.params(), &[Value::Bool(true), Value::I32(100)]);
    }

    #[test]
    fn test_subquery_must_be_select() {
        let registry = RepositoryRegistry::new();
        let query = Query::select("users").where_(Condition::in_subquery("id", Query::delete("orders")));
        let result = Postgres.compile(&query, &Resolver::new(&registry));
        assert!(matches!(result, Err(Error::InvalidQuery { .. })));
    }

    #[test]
    fn test_full_join_and_repository_source() {
        let registry = RepositoryRegistry::new().with(
            "orders",
            "shop_orders",
            FieldMapper::new().map("userId", "user_id"),
        );
        let query = Query::select("users")
            .fields(("users.id", "orders.userId"))
            .full_join(repository("orders"), Condition::columns_eq("orders.userId", "users.id"));
        let compiled = Postgres.compile(&query, &Resolver::new(&registry)).unwrap();
        assert_eq!(
            compiled.sql(),
            Some(
                "SELECT users.id, orders.user_id FROM users \
                 FULL OUTER JOIN shop_orders AS orders ON orders.user_id = users.id"
            )
        );
    }

    #[test]
    fn test_unregistered_join_repository_fails() {
        let registry = RepositoryRegistry::new();
        let query = Query::select("users").inner_join(repository("orders"), Condition::columns_eq("orders.user_id", "users.id"));
        let result = Postgres.compile(&query, &Resolver::new(&registry));
        assert!(matches!(result, Err(Error::RepositoryNotFound { .. })));
    }

    #[test]
    fn test_aggregates_group_by_having() {
        let query = Query::select("employees")
            .fields((
                "department",
                Aggregate::count("id").distinct().as_alias("headcount"),
                Aggregate::avg("salary").as_alias("avg_salary"),
            ))
            .group_by(["department"])
            .having(Condition::compare("salary", op::GT, 1000))
            .distinct();
        assert_eq!(
            compile(&query).sql(),
            Some(
                "SELECT DISTINCT department, COUNT(DISTINCT id) AS headcount, AVG(salary) AS avg_salary \
                 FROM employees GROUP BY department HAVING salary > $1"
            )
        );
    }

    #[test]
    fn test_aliased_writes_qualify_with_the_table() {
        let registry = RepositoryRegistry::new().with(
            "users",
            "app_users",
            FieldMapper::new().map("createdAt", "created_at"),
        );
        let resolver = Resolver::new(&registry).with_fallback(&registry.require("users").unwrap().mapper);

        let update = Query::update("app_users")
            .alias("users")
            .value("createdAt", "2024-01-01")
            .where_(("users.createdAt", op::LT, "2020-01-01"));
        assert_eq!(
            Postgres.compile(&update, &resolver).unwrap().sql(),
            Some("UPDATE app_users SET created_at = $1 WHERE app_users.created_at < $2")
        );

        let delete = Query::delete("app_users")
            .alias("users")
            .where_(Condition::in_subquery(
                "users.id",
                Query::select("sessions").fields("user_id").where_(("sessions.expired", true)),
            ));
        assert_eq!(
            Postgres.compile(&delete, &resolver).unwrap().sql(),
            Some(
                "DELETE FROM app_users WHERE app_users.id IN \
                 (SELECT user_id FROM sessions WHERE sessions.expired = $1)"
            )
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let query = Query::select("t").offset(5);
        assert_eq!(compile(&query).sql(), Some("SELECT * FROM t OFFSET 5"));
    }

    #[test]
    fn test_insert_update_delete() {
        let mapper = FieldMapper::new().map("createdAt", "created_at");
        let registry = RepositoryRegistry::new();
        let resolver = Resolver::new(&registry).with_fallback(&mapper);

        let insert = Query::insert("users").value("name", "Ada").value("createdAt", "2024-01-01");
        let compiled = Postgres.compile(&insert, &resolver).unwrap();
        assert_eq!(compiled.sql(), Some("INSERT INTO users (created_at, name) VALUES ($1, $2)"));

        let update = Query::update("users").value("name", "Grace").where_(("id", 7));
        let compiled = Postgres.compile(&update, &resolver).unwrap();
        assert_eq!(compiled.sql(), Some("UPDATE users SET name = $1 WHERE id = $2"));
        assert_eq!(compiled.params(), &[Value::String("Grace".into()), Value::I32(7)]);

        let delete = Query::delete("users").where_(("id", 7));
        let compiled = Postgres.compile(&delete, &resolver).unwrap();
        assert_eq!(compiled.sql(), Some("DELETE FROM users WHERE id = $1"));
    }

    #[test]
    fn test_writes_without_values_are_rejected() {
        let registry = RepositoryRegistry::new();
        let resolver = Resolver::new(&registry);
        assert!(matches!(
            Postgres.compile(&Query::insert("users"), &resolver),
            Err(Error::InvalidQuery { .. })
        ));
        assert!(matches!(
            Postgres.compile(&Query::update("users"), &resolver),
            Err(Error::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_joins_on_writes_are_rejected() {
        let registry = RepositoryRegistry::new();
        let query = Query::delete("users").inner_join(table("orders"), Condition::columns_eq("orders.user_id", "users.id"));
        let result = Postgres.compile(&query, &Resolver::new(&registry));
        assert!(matches!(result, Err(Error::InvalidQuery { .. })));
    }

    #[test]
    fn test_mapping_fallback_is_reported() {
        let query = Query::select("users").fields(FieldRef::Repository {
            repository: "ghost".into(),
            field: "x".into(),
        });
        let compiled = compile(&query);
        assert_eq!(compiled.sql(), Some("SELECT ghost.x FROM users"));
        assert_eq!(
            compiled.diagnostics,
            vec![Diagnostic::MappingFallback {
                repository: "ghost".into(),
                field: "x".into(),
            }]
        );
    }
}
