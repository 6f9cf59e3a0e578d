//! SQL generation shared by the relational dialects

use std::fmt::Write;

use super::{CompiledQuery, Statement};
use crate::diagnostic::Diagnostic;
use crate::query::{
    Aggregate, Condition, FieldRef, InSource, Join, JoinSource, JoinType, Query, QueryKind, Selection,
};
use crate::resolver::Resolver;
use crate::{Error, Operator, Result, Value};

/// How a dialect writes bound parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `$1, $2, ...`
    Numbered,
    /// `?`
    Question,
}

/// The knobs that distinguish one SQL dialect from another
#[derive(Debug)]
pub(crate) struct SqlSyntax {
    pub name: &'static str,
    pub placeholder: Placeholder,
    /// LIMIT value meaning "no limit", for dialects that cannot write a bare
    /// OFFSET
    pub unbounded_limit: Option<&'static str>,
}

/// Compile `query` following `syntax`; capabilities are checked by the caller
pub(crate) fn compile(syntax: &SqlSyntax, query: &Query, resolver: &Resolver<'_>) -> Result<CompiledQuery> {
    let mut writer = SqlWriter {
        syntax,
        resolver: *resolver,
        write_alias: None,
        sql: String::new(),
        params: Vec::new(),
        diagnostics: Vec::new(),
    };
    writer.write_query(query)?;

    tracing::debug!(dialect = syntax.name, sql = %writer.sql, params = writer.params.len(), "compiled query");
    Ok(CompiledQuery {
        kind: query.kind,
        statement: Statement::Sql {
            text: writer.sql,
            params: writer.params,
        },
        diagnostics: writer.diagnostics,
    })
}

struct SqlWriter<'s, 'r> {
    syntax: &'s SqlSyntax,
    resolver: Resolver<'r>,
    /// Alias of an UPDATE/DELETE target and the table it stands for
    write_alias: Option<(&'s str, &'s str)>,
    sql: String,
    params: Vec<Value>,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> SqlWriter<'s, '_> {
    fn write_query(&mut self, query: &'s Query) -> Result<()> {
        if query.kind != QueryKind::Select {
            if !query.joins.is_empty() || !query.group_by.is_empty() || query.having.is_some() {
                return Err(Error::invalid_query(format!(
                    "JOIN, GROUP BY and HAVING are only valid for SELECT, not {}",
                    query.kind
                )));
            }
            if !query.order_by.is_empty() || query.limit.is_some() || query.offset.is_some() {
                return Err(Error::invalid_query(format!(
                    "ORDER BY, LIMIT and OFFSET are only valid for SELECT, not {}",
                    query.kind
                )));
            }
            if !query.fields.is_empty() {
                return Err(Error::invalid_query(format!("{} does not take a field list", query.kind)));
            }
        }

        // Writes are emitted without an alias; qualifiers naming it target the table
        if matches!(query.kind, QueryKind::Update | QueryKind::Delete) {
            self.write_alias = query.alias.as_deref().map(|alias| (alias, query.table.as_str()));
        }

        match query.kind {
            QueryKind::Select => self.write_select(query),
            QueryKind::Insert => self.write_insert(query),
            QueryKind::Update => self.write_update(query),
            QueryKind::Delete => self.write_delete(query),
        }
    }

    fn write_select(&mut self, query: &Query) -> Result<()> {
        self.sql.push_str("SELECT ");
        if query.distinct {
            self.sql.push_str("DISTINCT ");
        }

        if query.fields.is_empty() {
            self.sql.push('*');
        } else {
            for (i, selection) in query.fields.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                match selection {
                    Selection::Field(field) => {
                        let column = self.field(field);
                        self.sql.push_str(&column);
                    }
                    Selection::Aggregate(aggregate) => self.write_aggregate(aggregate),
                }
            }
        }

        let _ = write!(self.sql, " FROM {}", query.table);
        if let Some(alias) = &query.alias {
            let _ = write!(self.sql, " AS {alias}");
        }

        for join in &query.joins {
            self.write_join(join)?;
        }

        if let Some(filter) = &query.filter {
            self.sql.push_str(" WHERE ");
            self.write_condition(filter)?;
        }

        if !query.group_by.is_empty() {
            let columns: Vec<String> = query.group_by.iter().map(|field| self.field(field)).collect();
            let _ = write!(self.sql, " GROUP BY {}", columns.join(", "));
        }

        if let Some(having) = &query.having {
            self.sql.push_str(" HAVING ");
            self.write_condition(having)?;
        }

        if !query.order_by.is_empty() {
            let entries: Vec<String> = query
                .order_by
                .iter()
                .map(|order| format!("{} {}", self.field(&order.field), order.direction))
                .collect();
            let _ = write!(self.sql, " ORDER BY {}", entries.join(", "));
        }

        match (query.limit, query.offset) {
            (Some(limit), Some(offset)) => {
                let _ = write!(self.sql, " LIMIT {limit} OFFSET {offset}");
            }
            (Some(limit), None) => {
                let _ = write!(self.sql, " LIMIT {limit}");
            }
            (None, Some(offset)) => match self.syntax.unbounded_limit {
                Some(unbounded) => {
                    let _ = write!(self.sql, " LIMIT {unbounded} OFFSET {offset}");
                }
                None => {
                    let _ = write!(self.sql, " OFFSET {offset}");
                }
            },
            (None, None) => {}
        }

        Ok(())
    }

    fn write_aggregate(&mut self, aggregate: &Aggregate) {
        let column = self.field(&aggregate.field);
        let distinct = if aggregate.distinct { "DISTINCT " } else { "" };
        let _ = write!(self.sql, "{}({distinct}{column})", aggregate.function);
        if let Some(alias) = &aggregate.alias {
            let _ = write!(self.sql, " AS {alias}");
        }
    }

    fn write_join(&mut self, join: &Join) -> Result<()> {
        let table = match &join.source {
            JoinSource::Table(table) => table.as_str(),
            JoinSource::Repository(name) => self.resolver.registry().require(name)?.table.as_str(),
        };
        let name = join.name();
        let source = if table == name {
            table.to_string()
        } else {
            format!("{table} AS {name}")
        };

        let keyword = match join.kind {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
        };
        let _ = write!(self.sql, " {keyword} {source} ON ");
        self.write_condition(&join.on)
    }

    fn write_insert(&mut self, query: &Query) -> Result<()> {
        if query.values.is_empty() {
            return Err(Error::invalid_query("INSERT requires at least one value"));
        }
        if query.filter.is_some() {
            return Err(Error::invalid_query("INSERT does not take a WHERE clause"));
        }

        let columns: Vec<String> = query.values.keys().map(|key| self.resolver.column(key)).collect();
        let _ = write!(self.sql, "INSERT INTO {} ({}) VALUES (", query.table, columns.join(", "));
        for (i, value) in query.values.values().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_param(value.clone());
        }
        self.sql.push(')');
        Ok(())
    }

    fn write_update(&mut self, query: &Query) -> Result<()> {
        if query.values.is_empty() {
            return Err(Error::invalid_query("UPDATE requires at least one value"));
        }

        let _ = write!(self.sql, "UPDATE {} SET ", query.table);
        for (i, (key, value)) in query.values.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            let column = self.resolver.column(key);
            let _ = write!(self.sql, "{column} = ");
            self.push_param(value.clone());
        }

        if let Some(filter) = &query.filter {
            self.sql.push_str(" WHERE ");
            self.write_condition(filter)?;
        }
        Ok(())
    }

    fn write_delete(&mut self, query: &Query) -> Result<()> {
        let _ = write!(self.sql, "DELETE FROM {}", query.table);
        if let Some(filter) = &query.filter {
            self.sql.push_str(" WHERE ");
            self.write_condition(filter)?;
        }
        Ok(())
    }

    fn write_condition(&mut self, condition: &Condition) -> Result<()> {
        match condition {
            Condition::Compare { field, op, value } => {
                let column = self.field(field);
                match (op, value) {
                    (Operator::Eq, Value::Null) => {
                        let _ = write!(self.sql, "{column} IS NULL");
                    }
                    (Operator::NotEq, Value::Null) => {
                        let _ = write!(self.sql, "{column} IS NOT NULL");
                    }
                    _ => {
                        let _ = write!(self.sql, "{column} {op} ");
                        self.push_param(value.clone());
                    }
                }
            }
            Condition::Columns { left, op, right } => {
                let left = self.field(left);
                let right = self.field(right);
                let _ = write!(self.sql, "{left} {op} {right}");
            }
            Condition::In { field, negated, source } => {
                let column = self.field(field);
                let keyword = if *negated { "NOT IN" } else { "IN" };
                match source {
                    InSource::Values(values) if values.is_empty() => {
                        self.sql.push_str(if *negated { "1 = 1" } else { "1 = 0" });
                    }
                    InSource::Values(values) => {
                        let _ = write!(self.sql, "{column} {keyword} (");
                        for (i, value) in values.iter().enumerate() {
                            if i > 0 {
                                self.sql.push_str(", ");
                            }
                            self.push_param(value.clone());
                        }
                        self.sql.push(')');
                    }
                    InSource::Subquery(subquery) => {
                        if subquery.kind != QueryKind::Select {
                            return Err(Error::invalid_query(format!(
                                "subquery for '{field}' must be a SELECT, not {}",
                                subquery.kind
                            )));
                        }
                        let _ = write!(self.sql, "{column} {keyword} (");
                        let outer = self.resolver;
                        self.resolver = outer.for_table(&subquery.table);
                        let result = self.write_select(subquery);
                        self.resolver = outer;
                        result?;
                        self.sql.push(')');
                    }
                }
            }
            Condition::Null { field, negated } => {
                let column = self.field(field);
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                let _ = write!(self.sql, "{column} {keyword}");
            }
            Condition::Between { field, low, high } => {
                let column = self.field(field);
                let _ = write!(self.sql, "{column} BETWEEN ");
                self.push_param(low.clone());
                self.sql.push_str(" AND ");
                self.push_param(high.clone());
            }
            Condition::Like { field, pattern } => {
                let column = self.field(field);
                let _ = write!(self.sql, "{column} LIKE ");
                self.push_param(Value::String(pattern.clone()));
            }
            Condition::And { conditions } => self.write_group(conditions, " AND ", "1 = 1")?,
            Condition::Or { conditions } => self.write_group(conditions, " OR ", "1 = 0")?,
            Condition::Not { condition } => {
                self.sql.push_str("NOT (");
                self.write_condition(condition)?;
                self.sql.push(')');
            }
        }
        Ok(())
    }

    fn write_group(&mut self, conditions: &[Condition], separator: &str, empty: &str) -> Result<()> {
        if conditions.is_empty() {
            self.sql.push_str(empty);
            return Ok(());
        }
        self.sql.push('(');
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            self.write_condition(condition)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn field(&mut self, field: &FieldRef) -> String {
        let (mut resolved, diagnostic) = self.resolver.resolve_with_diagnostic(field);
        if let Some(diagnostic) = diagnostic {
            diagnostic.log();
            self.diagnostics.push(diagnostic);
        }
        if let (Some((alias, table)), Some(qualifier)) = (self.write_alias, &resolved.table) {
            if qualifier == alias {
                resolved.table = Some(table.to_string());
            }
        }
        resolved.to_string()
    }

    fn push_param(&mut self, value: Value) {
        self.params.push(value);
        match self.syntax.placeholder {
            Placeholder::Numbered => {
                let _ = write!(self.sql, "${}", self.params.len());
            }
            Placeholder::Question => self.sql.push('?'),
        }
    }
}
