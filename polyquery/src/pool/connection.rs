use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::pool::{Live, SharedPool};
use super::ManageConnection;

/// A connection checked out of a [`Pool`](super::Pool)
///
/// Dropping it returns the connection to the pool, or hands it straight to
/// the oldest waiting acquire.
pub struct PooledConnection<M: ManageConnection> {
    shared: Arc<SharedPool<M>>,
    // Only `None` between `Drop`/`discard` taking it and the value going away
    live: Option<Live<M::Connection>>,
}

impl<M: ManageConnection> PooledConnection<M> {
    pub(crate) fn new(shared: Arc<SharedPool<M>>, live: Live<M::Connection>) -> Self {
        Self {
            shared,
            live: Some(live),
        }
    }

    /// Pool-wide id of this connection
    pub fn id(&self) -> u64 {
        self.live.as_ref().map_or(0, |live| live.id)
    }

    /// Close the connection instead of returning it, e.g. after an I/O error
    ///
    /// The freed slot goes to the oldest waiter, which opens a fresh
    /// connection in it. Without a waiter, a pool left below its minimum
    /// opens a replacement in the background.
    pub fn discard(mut self) {
        if let Some(live) = self.live.take() {
            self.shared.dispose(live);
            self.shared.release_slot();
            self.shared.replenish();
        }
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match &self.live {
            Some(live) => &live.raw,
            None => unreachable!("pooled connection accessed after release"),
        }
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.live {
            Some(live) => &mut live.raw,
            None => unreachable!("pooled connection accessed after release"),
        }
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(live) = self.live.take() {
            self.shared.release(live);
        }
    }
}

impl<M: ManageConnection> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection").field("id", &self.id()).finish()
    }
}
