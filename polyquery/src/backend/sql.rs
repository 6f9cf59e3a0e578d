//! sqlx-backed connections for PostgreSQL, MySQL and SQLite

use polyquery_core::{CompiledQuery, QueryKind, Statement, Value};
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::{Any, AnyConnection, Column, Connection, Row as _};

use super::{Execute, QueryOutcome, Row};
use crate::pool::ManageConnection;
use crate::{Error, Result};

/// Opens sqlx connections through the `Any` driver
///
/// The URL scheme (`postgres://`, `mysql://`, `sqlite:`) picks the driver;
/// only drivers enabled as cargo features are available.
#[derive(Debug, Clone)]
pub struct SqlxManager {
    url: String,
    write_ahead_log: bool,
}

impl SqlxManager {
    pub fn new(url: &str) -> Self {
        sqlx::any::install_default_drivers();
        Self {
            url: url.to_string(),
            write_ahead_log: false,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ManageConnection for SqlxManager {
    type Connection = AnyConnection;

    async fn connect(&self) -> Result<AnyConnection> {
        let mut conn = AnyConnection::connect(&self.url).await?;
        if self.write_ahead_log {
            sqlx::query("PRAGMA journal_mode=WAL").execute(&mut conn).await?;
        }
        Ok(conn)
    }

    async fn disconnect(&self, conn: AnyConnection) {
        if let Err(err) = conn.close().await {
            tracing::warn!(error = %err, "failed to close database connection");
        }
    }

    fn enable_write_ahead_log(&mut self) {
        self.write_ahead_log = true;
    }
}

impl Execute for AnyConnection {
    async fn execute(&mut self, compiled: &CompiledQuery) -> Result<QueryOutcome> {
        let (text, params) = match &compiled.statement {
            Statement::Sql { text, params } => (text, params),
            Statement::Payload(_) => {
                return Err(Error::config("SQL connections cannot run payload statements"));
            }
        };

        let query = bind_values(sqlx::query(text), params);
        if compiled.kind == QueryKind::Select {
            let rows = query.fetch_all(&mut *self).await?;
            let rows = rows.iter().map(row_to_json).collect::<Result<Vec<_>>>()?;
            Ok(QueryOutcome {
                rows,
                affected_rows: None,
                insert_id: None,
            })
        } else {
            let result = query.execute(&mut *self).await?;
            let mut insert_id = result.last_insert_id();
            // The Any driver never reports SQLite row ids
            if insert_id.is_none() && compiled.kind == QueryKind::Insert && self.backend_name() == "SQLite" {
                insert_id = Some(
                    sqlx::query_scalar::<_, i64>("SELECT last_insert_rowid()")
                        .fetch_one(&mut *self)
                        .await?,
                );
            }
            Ok(QueryOutcome {
                rows: Vec::new(),
                affected_rows: Some(result.rows_affected()),
                insert_id,
            })
        }
    }
}

fn bind_values<'q>(
    mut query: sqlx::query::Query<'q, Any, AnyArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, Any, AnyArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i32>),
            Value::Bool(b) => query.bind(*b),
            Value::I32(i) => query.bind(*i),
            Value::I64(i) => query.bind(*i),
            Value::F32(f) => query.bind(*f),
            Value::F64(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(bytes) => query.bind(bytes.as_slice()),
            // The Any driver has no JSON or array type; send them as JSON text
            Value::Json(_) | Value::Array(_) => query.bind(param.to_json().to_string()),
        };
    }
    query
}

fn row_to_json(row: &AnyRow) -> Result<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        map.insert(column.name().to_string(), column_to_json(row, index)?);
    }
    Ok(map)
}

// The Any driver only decodes a column as its own type, so try each in turn
fn column_to_json(row: &AnyRow, index: usize) -> Result<serde_json::Value> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map_or(serde_json::Value::Null, Into::into));
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return Ok(value.map_or(serde_json::Value::Null, Into::into));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value
            .and_then(serde_json::Number::from_f64)
            .map_or(serde_json::Value::Null, serde_json::Value::Number));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map_or(serde_json::Value::Null, Into::into));
    }
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.map_or(serde_json::Value::Null, Into::into));
    }
    let bytes = row.try_get::<Option<Vec<u8>>, _>(index)?;
    Ok(bytes.map_or(serde_json::Value::Null, Into::into))
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use polyquery_core::{op, Dialect, Query, RepositoryRegistry, Resolver, Sqlite};

    use super::*;

    async fn compile_and_run(conn: &mut AnyConnection, query: Query) -> QueryOutcome {
        let registry = RepositoryRegistry::new();
        let compiled = Sqlite.compile(&query, &Resolver::new(&registry)).unwrap();
        conn.execute(&compiled).await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_against_in_memory_sqlite() {
        let manager = SqlxManager::new("sqlite::memory:");
        let mut conn = manager.connect().await.unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, score REAL)")
            .execute(&mut conn)
            .await
            .unwrap();

        let inserted = compile_and_run(
            &mut conn,
            Query::insert("users").value("name", "Ada").value("score", 9.5),
        )
        .await;
        assert_eq!(inserted.affected_rows, Some(1));
        assert_eq!(inserted.insert_id, Some(1));

        let second = compile_and_run(&mut conn, Query::insert("users").value("name", "Grace")).await;
        assert_eq!(second.insert_id, Some(2));

        let updated = compile_and_run(
            &mut conn,
            Query::update("users").value("score", 7.0).where_(("name", "Grace")),
        )
        .await;
        assert_eq!(updated.affected_rows, Some(1));
        assert_eq!(updated.insert_id, None);

        let selected = compile_and_run(
            &mut conn,
            Query::select("users").fields(("id", "name", "score")).where_(("id", op::LTE, 2)).order_by_asc("id"),
        )
        .await;
        assert_eq!(selected.rows.len(), 2);
        assert_eq!(selected.rows[0]["name"], serde_json::json!("Ada"));
        assert_eq!(selected.rows[0]["score"], serde_json::json!(9.5));
        assert_eq!(selected.rows[1]["score"], serde_json::Value::Null);

        manager.disconnect(conn).await;
    }

    #[tokio::test]
    async fn test_payload_statements_are_rejected() {
        let manager = SqlxManager::new("sqlite::memory:");
        let mut conn = manager.connect().await.unwrap();
        let compiled = CompiledQuery {
            kind: QueryKind::Select,
            statement: Statement::Payload(serde_json::json!({})),
            diagnostics: Vec::new(),
        };
        assert!(matches!(conn.execute(&compiled).await, Err(Error::Config { .. })));
    }
}
