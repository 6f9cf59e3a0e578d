//! Request/response transport for remote query services

use std::time::Duration;

use polyquery_core::{CompiledQuery, Statement};
use serde::Deserialize;
use serde_json::json;

use super::{Execute, QueryOutcome, Row};
use crate::pool::ManageConnection;
use crate::{Error, Result};

/// Builds [`HttpConnection`]s that post statements to one endpoint
///
/// The underlying `reqwest::Client` keeps its own keep-alive pool, so a
/// connection is only a cheap handle to it.
#[derive(Debug, Clone)]
pub struct HttpManager {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpManager {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ManageConnection for HttpManager {
    type Connection = HttpConnection;

    async fn connect(&self) -> Result<HttpConnection> {
        Ok(HttpConnection {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
        })
    }

    async fn disconnect(&self, _conn: HttpConnection) {}
}

/// One request channel to a remote query service
#[derive(Debug)]
pub struct HttpConnection {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteResponse {
    #[serde(default)]
    rows: Vec<Row>,
    affected_rows: Option<u64>,
    insert_id: Option<i64>,
    error: Option<String>,
}

impl Execute for HttpConnection {
    async fn execute(&mut self, compiled: &CompiledQuery) -> Result<QueryOutcome> {
        let query = match &compiled.statement {
            Statement::Payload(payload) => payload.clone(),
            Statement::Sql { text, params } => json!({ "sql": text, "params": params }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": query }))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| value.get("error")?.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::remote(message));
        }

        let parsed: RemoteResponse = serde_json::from_str(&body)?;
        if let Some(message) = parsed.error {
            return Err(Error::remote(message));
        }
        Ok(QueryOutcome {
            rows: parsed.rows,
            affected_rows: parsed.affected_rows,
            insert_id: parsed.insert_id,
        })
    }
}
