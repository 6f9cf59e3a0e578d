use std::future::Future;

use crate::Result;

/// Opens and closes the raw connections a pool hands out
pub trait ManageConnection: Send + Sync + 'static {
    /// The connection type for this manager
    type Connection: Send + 'static;

    /// Open a new connection
    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Close a connection the pool no longer needs
    fn disconnect(&self, conn: Self::Connection) -> impl Future<Output = ()> + Send;

    /// Switch future connections to write-ahead logging
    ///
    /// Called once when a single-writer strategy is built; managers for
    /// backends without the notion leave it as a no-op.
    fn enable_write_ahead_log(&mut self) {}
}
