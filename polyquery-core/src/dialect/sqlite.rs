use super::sql::{self, Placeholder, SqlSyntax};
use super::{CompiledQuery, Dialect};
use crate::query::{JoinType, Query};
use crate::resolver::Resolver;
use crate::Result;

const SYNTAX: SqlSyntax = SqlSyntax {
    name: "sqlite",
    placeholder: Placeholder::Question,
    unbounded_limit: Some("-1"),
};

const JOINS: [JoinType; 2] = [JoinType::Inner, JoinType::Left];

/// SQLite: `?` placeholders, INNER and LEFT joins only
#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Dialect for Sqlite {
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
