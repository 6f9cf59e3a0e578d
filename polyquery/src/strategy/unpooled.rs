use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::{AccessMode, ConnectionStrategy, Lease};
use crate::pool::{ManageConnection, PoolStatus};
use crate::{Error, Result};

/// A connection opened for a single lease
///
/// Dropping it closes the connection through its manager in the background.
pub struct EphemeralConnection<M: ManageConnection> {
    manager: Arc<M>,
    // Only `None` once `Drop` has taken it
    conn: Option<M::Connection>,
}

impl<M: ManageConnection> Deref for EphemeralConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("ephemeral connection accessed after close"),
        }
    }
}

impl<M: ManageConnection> DerefMut for EphemeralConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("ephemeral connection accessed after close"),
        }
    }
}

impl<M: ManageConnection> Drop for EphemeralConnection<M> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else { return };
        match Handle::try_current() {
            Ok(handle) => {
                let manager = Arc::clone(&self.manager);
                handle.spawn(async move {
                    manager.disconnect(conn).await;
                });
            }
            Err(_) => drop(conn),
        }
    }
}

/// A fresh transport per lease, for request/response backends
///
/// Nothing is retained between leases, so there is no occupancy to report.
pub struct UnpooledTransport<M: ManageConnection> {
    manager: Arc<M>,
    closed: AtomicBool,
}

impl<M: ManageConnection> UnpooledTransport<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager: Arc::new(manager),
            closed: AtomicBool::new(false),
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }
}

impl<M: ManageConnection> ConnectionStrategy for UnpooledTransport<M> {
    type Manager = M;

    fn name(&self) -> &'static str {
        "unpooled"
    }

    async fn lease(&self, _mode: AccessMode) -> Result<Lease<M>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }
        let conn = self.manager.connect().await?;
        Ok(Lease::Ephemeral(EphemeralConnection {
            manager: Arc::clone(&self.manager),
            conn: Some(conn),
        }))
    }

    /// Pooling does not apply
    fn status(&self) -> Option<PoolStatus> {
        None
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
