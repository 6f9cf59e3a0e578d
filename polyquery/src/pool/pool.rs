//! Connection pool implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Notify};
use tokio::task::AbortHandle;
use tokio::time::Instant;

use super::connection::PooledConnection;
use super::{ManageConnection, PoolConfig, PoolState, PoolStatus};
use crate::{Error, Result};

/// A raw connection tagged with a pool-wide id
pub(crate) struct Live<C> {
    pub id: u64,
    pub raw: C,
}

struct IdleConnection<C> {
    live: Live<C>,
    since: Instant,
    reaper: Option<AbortHandle>,
}

/// What a release passes to a parked waiter
enum Handoff<C> {
    /// A ready connection; the in-use count moves with it
    Connection(Live<C>),
    /// Permission to open a connection in a slot that was freed
    Slot,
}

struct Waiter<C> {
    id: u64,
    tx: oneshot::Sender<Handoff<C>>,
}

struct Internals<C> {
    state: PoolState,
    idle: VecDeque<IdleConnection<C>>,
    /// Checked-out connections plus slots reserved for connections being opened
    active: u32,
    waiters: VecDeque<Waiter<C>>,
    next_waiter: u64,
}

impl<C> Internals<C> {
    fn total(&self) -> u32 {
        self.active + self.idle.len() as u32
    }

    fn is_shutting_down(&self) -> bool {
        matches!(self.state, PoolState::Draining | PoolState::Closed)
    }

    /// Give `handoff` to the oldest waiter still listening; returns it when
    /// nobody took it
    fn hand_off(&mut self, mut handoff: Handoff<C>) -> Option<Handoff<C>> {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.tx.send(handoff) {
                Ok(()) => return None,
                Err(returned) => handoff = returned,
            }
        }
        Some(handoff)
    }

    /// Drop one in-use count while draining; true once nothing is left
    fn finish_one(&mut self) -> bool {
        self.active = self.active.saturating_sub(1);
        if self.active == 0 && self.idle.is_empty() {
            self.state = PoolState::Closed;
            true
        } else {
            false
        }
    }
}

pub(crate) struct SharedPool<M: ManageConnection> {
    pub(crate) manager: M,
    config: PoolConfig,
    internals: Mutex<Internals<M::Connection>>,
    drained: Notify,
    next_id: AtomicU64,
}

impl<M: ManageConnection> SharedPool<M> {
    /// Return a checked-out connection
    pub(crate) fn release(self: &Arc<Self>, live: Live<M::Connection>) {
        let mut internals = self.internals.lock();

        if internals.is_shutting_down() {
            let finished = internals.finish_one();
            drop(internals);
            self.dispose(live);
            if finished {
                tracing::debug!("connection pool closed");
                self.drained.notify_waiters();
            }
            return;
        }

        if let Some(Handoff::Connection(live)) = internals.hand_off(Handoff::Connection(live)) {
            internals.active -= 1;
            let reaper = self.arm_reaper(live.id);
            internals.idle.push_back(IdleConnection {
                live,
                since: Instant::now(),
                reaper,
            });
        }
    }

    /// Give back a reserved or emptied slot without a connection
    pub(crate) fn release_slot(self: &Arc<Self>) {
        let mut internals = self.internals.lock();

        if internals.is_shutting_down() {
            if internals.finish_one() {
                drop(internals);
                tracing::debug!("connection pool closed");
                self.drained.notify_waiters();
            }
            return;
        }

        if internals.hand_off(Handoff::Slot).is_some() {
            internals.active -= 1;
        }
    }

    /// Open a connection into a slot already counted as active; the slot is
    /// given back if opening fails
    async fn open(self: &Arc<Self>) -> Result<Live<M::Connection>> {
        let reservation = SlotReservation {
            shared: Some(Arc::clone(self)),
        };
        let raw = self.manager.connect().await?;
        reservation.disarm();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(connection_id = id, "opened connection");
        Ok(Live { id, raw })
    }

    /// Top the pool back up to its minimum after a discard
    pub(crate) fn replenish(self: &Arc<Self>) {
        let Ok(handle) = Handle::try_current() else { return };
        {
            let mut internals = self.internals.lock();
            if internals.is_shutting_down() || internals.total() >= self.config.min_connections {
                return;
            }
            internals.active += 1;
        }

        let shared = Arc::clone(self);
        handle.spawn(async move {
            match shared.open().await {
                Ok(live) => shared.release(live),
                Err(err) => tracing::warn!(error = %err, "failed to replenish connection pool"),
            }
        });
    }

    /// Close a connection in the background
    pub(crate) fn dispose(self: &Arc<Self>, live: Live<M::Connection>) {
        tracing::debug!(connection_id = live.id, "closing connection");
        match Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(self);
                handle.spawn(async move {
                    shared.manager.disconnect(live.raw).await;
                });
            }
            Err(_) => drop(live),
        }
    }

    fn arm_reaper(self: &Arc<Self>, id: u64) -> Option<AbortHandle> {
        let timeout = self.config.idle_timeout?;
        let handle = Handle::try_current().ok()?;
        let pool = Arc::downgrade(self);
        let task = handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            evict(pool, id);
        });
        Some(task.abort_handle())
    }

    fn evict(self: &Arc<Self>, id: u64) {
        let mut internals = self.internals.lock();
        let Some(position) = internals.idle.iter().position(|idle| idle.live.id == id) else {
            return;
        };

        if internals.total() <= self.config.min_connections {
            // Stays idle until it is used again; no new timer
            if let Some(idle) = internals.idle.get_mut(position) {
                idle.reaper = None;
            }
            return;
        }

        if let Some(idle) = internals.idle.remove(position) {
            drop(internals);
            tracing::debug!(
                connection_id = id,
                idle_for = ?idle.since.elapsed(),
                "evicting idle connection"
            );
            self.dispose(idle.live);
        }
    }
}

fn evict<M: ManageConnection>(pool: Weak<SharedPool<M>>, id: u64) {
    if let Some(shared) = pool.upgrade() {
        shared.evict(id);
    }
}

/// Frees the reserved slot unless the connection was opened
struct SlotReservation<M: ManageConnection> {
    shared: Option<Arc<SharedPool<M>>>,
}

impl<M: ManageConnection> SlotReservation<M> {
    fn disarm(mut self) {
        self.shared = None;
    }
}

impl<M: ManageConnection> Drop for SlotReservation<M> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.release_slot();
        }
    }
}

enum Plan<C> {
    Reuse(Live<C>),
    Open,
    Wait(u64, oneshot::Receiver<Handoff<C>>),
}

/// A parked acquire; dropping it before a hand-off was consumed puts the
/// queue back in order
struct Waiting<M: ManageConnection> {
    shared: Arc<SharedPool<M>>,
    id: u64,
    rx: oneshot::Receiver<Handoff<M::Connection>>,
    settled: bool,
}

impl<M: ManageConnection> Drop for Waiting<M> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut internals = self.shared.internals.lock();
        if let Some(position) = internals.waiters.iter().position(|waiter| waiter.id == self.id) {
            internals.waiters.remove(position);
            return;
        }
        drop(internals);

        // A release already picked this waiter; pass what it sent along
        match self.rx.try_recv() {
            Ok(Handoff::Connection(live)) => self.shared.release(live),
            Ok(Handoff::Slot) => self.shared.release_slot(),
            Err(_) => {}
        }
    }
}

/// A pool of connections opened by a [`ManageConnection`]
///
/// Cloning is cheap; every clone refers to the same pool.
pub struct Pool<M: ManageConnection> {
    shared: Arc<SharedPool<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    /// Create a pool that opens connections on first use
    pub fn new(manager: M, config: PoolConfig) -> Result<Self> {
        Self::build(manager, config, PoolState::Active)
    }

    /// Create a pool, pre-warming it when `config.pre_connect` is set
    pub async fn connect(manager: M, config: PoolConfig) -> Result<Self> {
        let pre_connect = config.pre_connect;
        let pool = Self::build(manager, config, PoolState::Initializing)?;
        if pre_connect {
            if let Err(err) = pool.warm().await {
                pool.shutdown();
                return Err(err);
            }
        }

        let mut internals = pool.shared.internals.lock();
        if internals.state == PoolState::Initializing {
            internals.state = PoolState::Active;
        }
        drop(internals);
        Ok(pool)
    }

    fn build(manager: M, config: PoolConfig, state: PoolState) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(SharedPool {
                manager,
                config,
                internals: Mutex::new(Internals {
                    state,
                    idle: VecDeque::new(),
                    active: 0,
                    waiters: VecDeque::new(),
                    next_waiter: 0,
                }),
                drained: Notify::new(),
                next_id: AtomicU64::new(0),
            }),
        })
    }

    /// Open connections until the pool holds its warm count
    pub async fn warm(&self) -> Result<()> {
        let target = self.shared.config.warm_count();
        loop {
            {
                let mut internals = self.shared.internals.lock();
                if internals.is_shutting_down() {
                    return Err(Error::PoolClosed);
                }
                if internals.total() >= target {
                    break;
                }
                internals.active += 1;
            }
            // Dropping the connection parks it in the idle list
            drop(self.open_reserved().await?);
        }
        tracing::debug!(connections = target, "connection pool warmed");
        Ok(())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    pub fn state(&self) -> PoolState {
        self.shared.internals.lock().state
    }

    /// Snapshot of current occupancy; never waits on anything but the lock
    pub fn status(&self) -> PoolStatus {
        let internals = self.shared.internals.lock();
        let min = self.shared.config.min_connections;
        PoolStatus {
            total_connections: internals.total(),
            active_connections: internals.active,
            idle_connections: internals.idle.len() as u32,
            max_connections: self.shared.config.max_connections,
            min_connections: (min > 0).then_some(min),
        }
    }

    /// Acquire a connection, waiting up to the configured acquire timeout
    pub async fn acquire(&self) -> Result<PooledConnection<M>> {
        self.acquire_timeout(self.shared.config.acquire_timeout).await
    }

    /// Acquire a connection, waiting up to `timeout`
    ///
    /// An idle connection is reused first; otherwise a new one is opened
    /// while the pool is below its maximum; otherwise the call queues behind
    /// earlier callers until a release reaches it or the timeout elapses.
    pub async fn acquire_timeout(&self, timeout: Duration) -> Result<PooledConnection<M>> {
        let plan = {
            let mut internals = self.shared.internals.lock();
            if internals.is_shutting_down() {
                return Err(Error::PoolClosed);
            }

            if let Some(idle) = internals.idle.pop_back() {
                internals.active += 1;
                if let Some(reaper) = idle.reaper {
                    reaper.abort();
                }
                Plan::Reuse(idle.live)
            } else if internals.total() < self.shared.config.max_connections {
                internals.active += 1;
                Plan::Open
            } else {
                let (tx, rx) = oneshot::channel();
                let id = internals.next_waiter;
                internals.next_waiter += 1;
                internals.waiters.push_back(Waiter { id, tx });
                Plan::Wait(id, rx)
            }
        };

        let (id, rx) = match plan {
            Plan::Reuse(live) => return Ok(PooledConnection::new(Arc::clone(&self.shared), live)),
            Plan::Open => return self.open_reserved().await,
            Plan::Wait(id, rx) => (id, rx),
        };

        let mut waiting = Waiting {
            shared: Arc::clone(&self.shared),
            id,
            rx,
            settled: false,
        };

        match tokio::time::timeout(timeout, &mut waiting.rx).await {
            Ok(Ok(Handoff::Connection(live))) => {
                waiting.settled = true;
                Ok(PooledConnection::new(Arc::clone(&self.shared), live))
            }
            Ok(Ok(Handoff::Slot)) => {
                waiting.settled = true;
                self.open_reserved().await
            }
            Ok(Err(_)) => {
                waiting.settled = true;
                Err(Error::PoolClosed)
            }
            Err(_) => {
                tracing::debug!(?timeout, "timed out waiting for a connection");
                Err(Error::AcquireTimeout { timeout })
            }
        }
    }

    /// Open a connection into a slot the caller already counted as active
    async fn open_reserved(&self) -> Result<PooledConnection<M>> {
        let live = self.shared.open().await?;
        let conn = PooledConnection::new(Arc::clone(&self.shared), live);

        if self.shared.internals.lock().is_shutting_down() {
            // Dropping hands it to the draining release path
            drop(conn);
            return Err(Error::PoolClosed);
        }
        Ok(conn)
    }

    /// Start draining: reject new acquires and queued waiters, close idle
    /// connections now and in-use ones as they are released
    pub fn shutdown(&self) {
        let (idle, waiters, finished) = {
            let mut internals = self.shared.internals.lock();
            if internals.is_shutting_down() {
                return;
            }
            internals.state = PoolState::Draining;
            let idle: Vec<_> = internals.idle.drain(..).collect();
            let waiters: Vec<_> = internals.waiters.drain(..).collect();
            let finished = internals.active == 0;
            if finished {
                internals.state = PoolState::Closed;
            }
            (idle, waiters, finished)
        };

        tracing::debug!(
            idle = idle.len(),
            waiters = waiters.len(),
            "connection pool draining"
        );
        // Dropped senders wake their waiters with PoolClosed
        drop(waiters);
        for entry in idle {
            if let Some(reaper) = entry.reaper {
                reaper.abort();
            }
            self.shared.dispose(entry.live);
        }
        if finished {
            tracing::debug!("connection pool closed");
            self.shared.drained.notify_waiters();
        }
    }

    /// Drain the pool and wait until every connection is closed
    pub async fn close(&self) {
        self.shutdown();
        loop {
            let drained = self.shared.drained.notified();
            if self.state() == PoolState::Closed {
                return;
            }
            drained.await;
        }
    }
}

impl<M: ManageConnection> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("state", &self.state())
            .field("status", &self.status())
            .finish()
    }
}
