use super::{AccessMode, ConnectionStrategy, Lease};
use crate::pool::{ManageConnection, Pool, PoolConfig, PoolStatus};
use crate::Result;

/// Reads and writes share one pool
#[derive(Debug)]
pub struct SymmetricPool<M: ManageConnection> {
    pool: Pool<M>,
}

impl<M: ManageConnection> SymmetricPool<M> {
    pub async fn connect(manager: M, config: PoolConfig) -> Result<Self> {
        Ok(Self {
            pool: Pool::connect(manager, config).await?,
        })
    }

    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }
}

impl<M: ManageConnection> ConnectionStrategy for SymmetricPool<M> {
    type Manager = M;

    fn name(&self) -> &'static str {
        "symmetric"
    }

    async fn lease(&self, _mode: AccessMode) -> Result<Lease<M>> {
        Ok(Lease::Pooled(self.pool.acquire().await?))
    }

    fn status(&self) -> Option<PoolStatus> {
        Some(self.pool.status())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
