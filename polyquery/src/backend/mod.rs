//! Providers: a dialect plus a connection strategy behind one interface

mod any;
mod http;
mod sql;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use polyquery_core::{CompiledQuery, Dialect};
use serde::{Deserialize, Serialize};

pub use any::AnyProvider;
pub use http::{HttpConnection, HttpManager};
pub use sql::SqlxManager;

use crate::pool::{ManageConnection, PoolStatus};
use crate::strategy::{AccessMode, ConnectionStrategy};
use crate::{Error, Result};

/// One result row, keyed by column name
pub type Row = serde_json::Map<String, serde_json::Value>;

/// What executing a statement produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_id: Option<i64>,
}

/// A connection that can run compiled statements
pub trait Execute: Send {
    fn execute(&mut self, query: &CompiledQuery) -> impl Future<Output = Result<QueryOutcome>> + Send;
}

/// A backend the repository layer can talk to
pub trait Provider: Send + Sync {
    /// The dialect statements for this provider are compiled with
    fn dialect(&self) -> &dyn Dialect;

    /// Open the underlying pool or transport; idempotent
    fn connect(&self) -> impl Future<Output = Result<()>> + Send;

    /// Close every connection; the provider can be connected again later
    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    fn is_connected(&self) -> bool;

    /// Run a statement produced by [`Provider::dialect`]
    fn execute_compiled(&self, query: &CompiledQuery) -> impl Future<Output = Result<QueryOutcome>> + Send;

    /// Occupancy of the provider's pool, if it pools
    fn pool_status(&self) -> Option<PoolStatus> {
        None
    }
}

type Opener<S> = Box<dyn Fn() -> BoxFuture<'static, Result<S>> + Send + Sync>;

/// A [`Provider`] built from a dialect and a connection strategy
///
/// The strategy is created on [`Provider::connect`] by the opener closure
/// and dropped on [`Provider::disconnect`].
pub struct Backend<S: ConnectionStrategy> {
    dialect: Box<dyn Dialect>,
    opener: Opener<S>,
    strategy: RwLock<Option<Arc<S>>>,
}

impl<S: ConnectionStrategy> Backend<S> {
    pub fn new<D, F, Fut>(dialect: D, opener: F) -> Self
    where
        D: Dialect + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S>> + Send + 'static,
    {
        Self {
            dialect: Box::new(dialect),
            opener: Box::new(move || opener().boxed()),
            strategy: RwLock::new(None),
        }
    }

    /// The live strategy, if connected
    pub fn strategy(&self) -> Result<Arc<S>> {
        self.strategy.read().clone().ok_or(Error::NotConnected)
    }
}

impl<S> Provider for Backend<S>
where
    S: ConnectionStrategy,
    <S::Manager as ManageConnection>::Connection: Execute,
{
    fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let strategy = Arc::new((self.opener)().await?);
        let name = strategy.name();
        let raced = {
            let mut slot = self.strategy.write();
            if slot.is_some() {
                Some(strategy)
            } else {
                *slot = Some(strategy);
                None
            }
        };
        // Another caller connected first; keep theirs
        if let Some(extra) = raced {
            extra.close().await;
            return Ok(());
        }

        tracing::debug!(dialect = self.dialect.name(), strategy = name, "provider connected");
        Ok(())
    }

    async fn disconnect(&self) {
        let strategy = self.strategy.write().take();
        if let Some(strategy) = strategy {
            strategy.close().await;
            tracing::debug!(dialect = self.dialect.name(), "provider disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.strategy.read().is_some()
    }

    async fn execute_compiled(&self, query: &CompiledQuery) -> Result<QueryOutcome> {
        let strategy = self.strategy()?;
        let mut lease = strategy.lease(AccessMode::for_kind(query.kind)).await?;
        tracing::debug!(dialect = self.dialect.name(), kind = %query.kind, "executing statement");
        lease.execute(query).await
    }

    fn pool_status(&self) -> Option<PoolStatus> {
        self.strategy.read().as_ref().and_then(|strategy| strategy.status())
    }
}

impl<S: ConnectionStrategy> fmt::Debug for Backend<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("dialect", &self.dialect.name())
            .field("connected", &self.strategy.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use polyquery_core::{table, Condition, MySql, Query, RepositoryRegistry, Resolver, Sqlite};

    use super::*;
    use crate::pool::PoolConfig;
    use crate::strategy::SymmetricPool;
    use crate::testing::MockManager;

    fn backend(manager: &MockManager) -> Backend<SymmetricPool<MockManager>> {
        let manager = manager.clone();
        Backend::new(Sqlite, move || SymmetricPool::connect(manager.clone(), PoolConfig::new()))
    }

    #[tokio::test]
    async fn test_execute_requires_connect() {
        let manager = MockManager::new();
        let backend = backend(&manager);
        let registry = RepositoryRegistry::new();
        let compiled = backend
            .dialect()
            .compile(&Query::select("users"), &Resolver::new(&registry))
            .unwrap();

        assert!(matches!(
            backend.execute_compiled(&compiled).await,
            Err(Error::NotConnected)
        ));
        assert_eq!(backend.pool_status(), None);

        backend.connect().await.unwrap();
        backend.connect().await.unwrap();
        assert!(backend.is_connected());
        backend.execute_compiled(&compiled).await.unwrap();
        assert_eq!(manager.executed(), vec![(0, "SELECT * FROM users".to_string())]);
        assert_eq!(backend.pool_status().map(|s| s.idle_connections), Some(1));

        backend.disconnect().await;
        assert!(!backend.is_connected());
    }

    #[tokio::test]
    async fn test_capability_gating_happens_before_any_connection() {
        let manager = MockManager::new();
        let manager_for_backend = manager.clone();
        let backend = Backend::new(MySql, move || {
            SymmetricPool::connect(manager_for_backend.clone(), PoolConfig::new())
        });
        backend.connect().await.unwrap();

        let registry = RepositoryRegistry::new();
        let query = Query::select("users").full_join(table("orders"), Condition::columns_eq("orders.user_id", "users.id"));
        let result = backend.dialect().compile(&query, &Resolver::new(&registry));

        assert!(matches!(
            result,
            Err(polyquery_core::Error::UnsupportedCapability { dialect: "mysql", .. })
        ));
        assert_eq!(manager.opened(), 0);
        assert!(manager.executed().is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_leaves_provider_disconnected() {
        let manager = MockManager::new();
        let manager_for_backend = manager.clone();
        let backend = Backend::new(Sqlite, move || {
            SymmetricPool::connect(
                manager_for_backend.clone(),
                PoolConfig::new().with_min_connections(1).with_pre_connect(true),
            )
        });
        manager.fail_connects(true);
        assert!(backend.connect().await.is_err());
        assert!(!backend.is_connected());

        manager.fail_connects(false);
        backend.connect().await.unwrap();
        assert_eq!(manager.opened(), 1);
        assert_eq!(backend.pool_status().map(|s| s.total_connections), Some(1));
    }
}
