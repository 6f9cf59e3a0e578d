//! In-memory connection manager for unit tests

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use polyquery_core::CompiledQuery;

use crate::backend::{Execute, QueryOutcome, Row};
use crate::pool::ManageConnection;
use crate::{Error, Result};

#[derive(Default)]
struct MockState {
    opened: AtomicU64,
    closed: AtomicU64,
    fail_connect: AtomicBool,
    connect_limit: Mutex<Option<u64>>,
    wal: AtomicBool,
    executed: Mutex<Vec<(u64, String)>>,
    rows: Mutex<Vec<Row>>,
}

/// Hands out numbered fake connections and counts what happens to them
///
/// Clones share their counters, so a test can keep one copy while the pool
/// owns another.
#[derive(Clone, Default)]
pub(crate) struct MockManager {
    state: Arc<MockState>,
    connect_delay: Option<Duration>,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn fail_connects(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Refuse every connect once `opened` connections exist
    pub fn fail_after(&self, opened: u64) {
        *self.state.connect_limit.lock() = Some(opened);
    }

    pub fn set_rows(&self, rows: Vec<Row>) {
        *self.state.rows.lock() = rows;
    }

    pub fn opened(&self) -> u64 {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u64 {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn wal_enabled(&self) -> bool {
        self.state.wal.load(Ordering::SeqCst)
    }

    /// Statements run so far, with the id of the connection that ran them
    pub fn executed(&self) -> Vec<(u64, String)> {
        self.state.executed.lock().clone()
    }
}

pub(crate) struct MockConnection {
    pub id: u64,
    state: Arc<MockState>,
}

impl ManageConnection for MockManager {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let limit_reached = self
            .state
            .connect_limit
            .lock()
            .is_some_and(|limit| self.opened() >= limit);
        if limit_reached || self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(Error::remote("connection refused"));
        }
        let id = self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            id,
            state: Arc::clone(&self.state),
        })
    }

    async fn disconnect(&self, _conn: MockConnection) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn enable_write_ahead_log(&mut self) {
        self.state.wal.store(true, Ordering::SeqCst);
    }
}

impl Execute for MockConnection {
    async fn execute(&mut self, query: &CompiledQuery) -> Result<QueryOutcome> {
        self.state.executed.lock().push((self.id, query.to_string()));
        if query.kind.is_write() {
            Ok(QueryOutcome {
                rows: Vec::new(),
                affected_rows: Some(1),
                insert_id: Some(42),
            })
        } else {
            Ok(QueryOutcome {
                rows: self.state.rows.lock().clone(),
                affected_rows: None,
                insert_id: None,
            })
        }
    }
}
