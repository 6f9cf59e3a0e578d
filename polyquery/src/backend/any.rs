use polyquery_core::{CompiledQuery, Dialect, MySql, Postgres, Remote, Sqlite};

use super::{Backend, HttpManager, Provider, QueryOutcome, SqlxManager};
use crate::config::{ProviderConfig, ProviderType};
use crate::pool::PoolStatus;
use crate::strategy::{SingleWriterPool, SymmetricPool, UnpooledTransport};
use crate::Result;

/// A provider chosen at runtime from a [`ProviderConfig`]
///
/// * PostgreSQL and MySQL share one symmetric pool for reads and writes.
/// * SQLite gets a single writer plus a read pool.
/// * HTTP opens a fresh request channel per statement.
#[derive(Debug)]
pub enum AnyProvider {
    Sql(Backend<SymmetricPool<SqlxManager>>),
    Sqlite(Backend<SingleWriterPool<SqlxManager>>),
    Remote(Backend<UnpooledTransport<HttpManager>>),
}

impl AnyProvider {
    /// Build a provider; nothing is opened until [`Provider::connect`]
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let pool = config.pool.clone();

        let provider = match config.provider_type {
            ProviderType::Postgres | ProviderType::MySql => {
                let manager = SqlxManager::new(&config.url);
                let opener = move || SymmetricPool::connect(manager.clone(), pool.clone());
                if config.provider_type == ProviderType::Postgres {
                    AnyProvider::Sql(Backend::new(Postgres, opener))
                } else {
                    AnyProvider::Sql(Backend::new(MySql, opener))
                }
            }
            ProviderType::Sqlite => {
                let manager = SqlxManager::new(&config.url);
                let read_pool_size = config.read_pool_size;
                AnyProvider::Sqlite(Backend::new(Sqlite, move || {
                    SingleWriterPool::connect(manager.clone(), pool.clone(), read_pool_size)
                }))
            }
            ProviderType::Http => {
                let manager = HttpManager::new(&config.url, config.request_timeout)?;
                AnyProvider::Remote(Backend::new(Remote, move || {
                    let manager = manager.clone();
                    async move { Ok(UnpooledTransport::new(manager)) }
                }))
            }
        };

        tracing::debug!(provider = %config.provider_type, "provider configured");
        Ok(provider)
    }
}

impl Provider for AnyProvider {
    fn dialect(&self) -> &dyn Dialect {
        match self {
            AnyProvider::Sql(backend) => backend.dialect(),
            AnyProvider::Sqlite(backend) => backend.dialect(),
            AnyProvider::Remote(backend) => backend.dialect(),
        }
    }

    async fn connect(&self) -> Result<()> {
        match self {
            AnyProvider::Sql(backend) => backend.connect().await,
            AnyProvider::Sqlite(backend) => backend.connect().await,
            AnyProvider::Remote(backend) => backend.connect().await,
        }
    }

    async fn disconnect(&self) {
        match self {
            AnyProvider::Sql(backend) => backend.disconnect().await,
            AnyProvider::Sqlite(backend) => backend.disconnect().await,
            AnyProvider::Remote(backend) => backend.disconnect().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            AnyProvider::Sql(backend) => backend.is_connected(),
            AnyProvider::Sqlite(backend) => backend.is_connected(),
            AnyProvider::Remote(backend) => backend.is_connected(),
        }
    }

    async fn execute_compiled(&self, query: &CompiledQuery) -> Result<QueryOutcome> {
        match self {
            AnyProvider::Sql(backend) => backend.execute_compiled(query).await,
            AnyProvider::Sqlite(backend) => backend.execute_compiled(query).await,
            AnyProvider::Remote(backend) => backend.execute_compiled(query).await,
        }
    }

    fn pool_status(&self) -> Option<PoolStatus> {
        match self {
            AnyProvider::Sql(backend) => backend.pool_status(),
            AnyProvider::Sqlite(backend) => backend.pool_status(),
            AnyProvider::Remote(backend) => backend.pool_status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_follows_provider_type() {
        let cases = [
            (ProviderType::Postgres, "postgres://localhost/app", "postgres"),
            (ProviderType::MySql, "mysql://localhost/app", "mysql"),
            (ProviderType::Sqlite, "sqlite::memory:", "sqlite"),
            (ProviderType::Http, "http://localhost:8080/query", "remote"),
        ];
        for (provider_type, url, dialect) in cases {
            let provider = AnyProvider::from_config(&ProviderConfig::new(provider_type, url)).unwrap();
            assert_eq!(provider.dialect().name(), dialect);
            assert!(!provider.is_connected());
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ProviderConfig::new(ProviderType::Sqlite, "sqlite::memory:").with_read_pool_size(0);
        assert!(AnyProvider::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_http_provider_has_no_pool_status() {
        let config = ProviderConfig::new(ProviderType::Http, "http://localhost:8080/query");
        let provider = AnyProvider::from_config(&config).unwrap();
        provider.connect().await.unwrap();
        assert!(provider.is_connected());
        assert_eq!(provider.pool_status(), None);
        provider.disconnect().await;
        assert!(!provider.is_connected());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_sqlite_provider_reports_read_pool() {
        let config = ProviderConfig::new(ProviderType::Sqlite, "sqlite::memory:").with_read_pool_size(3);
        let provider = AnyProvider::from_config(&config).unwrap();
        provider.connect().await.unwrap();

        let status = provider.pool_status().unwrap();
        assert_eq!(status.max_connections, 3);
        assert_eq!(status.total_connections, 0);
        provider.disconnect().await;
    }
}
