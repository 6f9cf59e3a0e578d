use super::sql::{self, Placeholder, SqlSyntax};
use super::{CompiledQuery, Dialect};
use crate::query::{JoinType, Query};
use crate::resolver::Resolver;
use crate::Result;

const SYNTAX: SqlSyntax = SqlSyntax {
    name: "mysql",
    placeholder: Placeholder::Question,
    unbounded_limit: Some("18446744073709551615"),
};

const JOINS: [JoinType; 3] = [JoinType::Inner, JoinType::Left, JoinType::Right];

/// MySQL and MariaDB: `?` placeholders, no FULL OUTER JOIN
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        SYNTAX.name
    }

    fn supported_joins(&self) -> &'static [JoinType] {
        &JOINS
    }

    fn compile(&self, query: &Query, resolver: &Resolver<'_>) -> Result<CompiledQuery> {
        self.check_capabilities(query)?;
        sql::compile(&SYNTAX, query, resolver)
    }
}
