use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{AccessMode, ConnectionStrategy, Lease};
use crate::pool::{ManageConnection, Pool, PoolConfig, PoolStatus};
use crate::{Error, Result};

/// Exclusive use of a [`SingleWriterPool`]'s writer connection
pub struct WriterLease<M: ManageConnection> {
    // Always `Some`: a closed writer is never leased
    guard: OwnedMutexGuard<Option<M::Connection>>,
}

impl<M: ManageConnection> Deref for WriterLease<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match &*self.guard {
            Some(conn) => conn,
            None => unreachable!("writer leased after close"),
        }
    }
}

impl<M: ManageConnection> DerefMut for WriterLease<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut *self.guard {
            Some(conn) => conn,
            None => unreachable!("writer leased after close"),
        }
    }
}

/// One dedicated writer plus an independent pool of readers
///
/// For stores that serialize writes (SQLite): every write goes through the
/// same connection, one at a time, while reads proceed concurrently on
/// their own pool. The writer never counts toward the read pool.
pub struct SingleWriterPool<M: ManageConnection> {
    writer: Arc<Mutex<Option<M::Connection>>>,
    readers: Pool<M>,
    write_timeout: Duration,
}

impl<M: ManageConnection> SingleWriterPool<M> {
    /// Open the writer eagerly, then build a read pool of `read_pool_size`
    pub async fn connect(mut manager: M, config: PoolConfig, read_pool_size: u32) -> Result<Self> {
        manager.enable_write_ahead_log();
        let write_timeout = config.acquire_timeout;

        let read_config = PoolConfig {
            min_connections: config.min_connections.min(read_pool_size),
            ..config
        }
        .with_max_connections(read_pool_size);
        // Opens nothing until warmed or used
        let readers = Pool::new(manager, read_config)?;
        let writer = readers.manager().connect().await?;
        if readers.config().pre_connect {
            if let Err(err) = readers.warm().await {
                readers.manager().disconnect(writer).await;
                readers.close().await;
                return Err(err);
            }
        }

        tracing::debug!(read_pool_size, "single-writer pool ready");
        Ok(Self {
            writer: Arc::new(Mutex::new(Some(writer))),
            readers,
            write_timeout,
        })
    }

    pub fn readers(&self) -> &Pool<M> {
        &self.readers
    }

    async fn lease_writer(&self) -> Result<WriterLease<M>> {
        let guard = tokio::time::timeout(self.write_timeout, Arc::clone(&self.writer).lock_owned())
            .await
            .map_err(|_| Error::AcquireTimeout {
                timeout: self.write_timeout,
            })?;
        if guard.is_none() {
            return Err(Error::PoolClosed);
        }
        Ok(WriterLease { guard })
    }
}

impl<M: ManageConnection> ConnectionStrategy for SingleWriterPool<M> {
    type Manager = M;

    fn name(&self) -> &'static str {
        "single-writer"
    }

    async fn lease(&self, mode: AccessMode) -> Result<Lease<M>> {
        match mode {
            AccessMode::Write => Ok(Lease::Writer(self.lease_writer().await?)),
            AccessMode::Read => Ok(Lease::Pooled(self.readers.acquire().await?)),
        }
    }

    /// Reports the read pool; the writer is not part of it
    fn status(&self) -> Option<PoolStatus> {
        Some(self.readers.status())
    }

    async fn close(&self) {
        // Waits for an in-flight write to finish
        let writer = self.writer.lock().await.take();
        if let Some(conn) = writer {
            self.readers.manager().disconnect(conn).await;
        }
        self.readers.close().await;
    }
}
