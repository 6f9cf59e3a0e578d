//! Generic connection pool
//!
//! One `parking_lot` mutex guards the idle list, the in-use count and the
//! FIFO wait queue; it is never held across an `.await`. Waiters park on a
//! `oneshot` channel and a release hands its connection straight to the
//! oldest one.

mod config;
mod connection;
mod manager;
#[allow(clippy::module_inception)]
mod pool;

use std::fmt;

pub use config::PoolConfig;
pub use connection::PooledConnection;
pub use manager::ManageConnection;
pub use pool::Pool;

pub(crate) use config::millis;

/// Lifecycle of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Pre-warming connections
    Initializing,
    /// Serving acquires
    Active,
    /// Rejecting acquires; in-use connections close as they come back
    Draining,
    /// Every connection is gone
    Closed,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolState::Initializing => write!(f, "initializing"),
            PoolState::Active => write!(f, "active"),
            PoolState::Draining => write!(f, "draining"),
            PoolState::Closed => write!(f, "closed"),
        }
    }
}

/// A point-in-time snapshot of pool occupancy
///
/// `active_connections + idle_connections == total_connections` always
/// holds, and `total_connections <= max_connections`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
    pub max_connections: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_connections: Option<u32>,
}
