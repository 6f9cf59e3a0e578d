//! Connection strategies
//!
//! A strategy decides where a connection for one statement comes from:
//! a symmetric pool, a dedicated writer plus a read pool, or a fresh
//! transport per request.

mod single_writer;
mod symmetric;
mod unpooled;

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};

use polyquery_core::QueryKind;

pub use single_writer::{SingleWriterPool, WriterLease};
pub use symmetric::SymmetricPool;
pub use unpooled::{EphemeralConnection, UnpooledTransport};

use crate::pool::{ManageConnection, PoolStatus, PooledConnection};
use crate::Result;

/// Whether a statement only reads or also writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    pub fn for_kind(kind: QueryKind) -> Self {
        if kind.is_write() {
            AccessMode::Write
        } else {
            AccessMode::Read
        }
    }
}

/// A connection lent out for one unit of work
///
/// Dropping the lease gives the connection back to wherever it came from.
pub enum Lease<M: ManageConnection> {
    /// Checked out of a pool
    Pooled(PooledConnection<M>),
    /// Exclusive use of the single writer
    Writer(WriterLease<M>),
    /// Opened for this lease only; closed through the manager on drop
    Ephemeral(EphemeralConnection<M>),
}

impl<M: ManageConnection> Deref for Lease<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        match self {
            Lease::Pooled(conn) => conn,
            Lease::Writer(conn) => conn,
            Lease::Ephemeral(conn) => conn,
        }
    }
}

impl<M: ManageConnection> DerefMut for Lease<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Lease::Pooled(conn) => conn,
            Lease::Writer(conn) => conn,
            Lease::Ephemeral(conn) => conn,
        }
    }
}

impl<M: ManageConnection> fmt::Debug for Lease<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lease::Pooled(conn) => f.debug_tuple("Pooled").field(conn).finish(),
            Lease::Writer(_) => f.write_str("Writer"),
            Lease::Ephemeral(_) => f.write_str("Ephemeral"),
        }
    }
}

/// Where connections come from for one backend
pub trait ConnectionStrategy: Send + Sync + 'static {
    /// The manager that opens this strategy's connections
    type Manager: ManageConnection;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Lease a connection suitable for `mode`
    fn lease(&self, mode: AccessMode) -> impl Future<Output = Result<Lease<Self::Manager>>> + Send;

    /// Occupancy snapshot; `None` when the strategy does not pool
    fn status(&self) -> Option<PoolStatus>;

    /// Stop leasing and close every connection
    fn close(&self) -> impl Future<Output = ()> + Send;
}
