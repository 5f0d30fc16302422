//! Connection identity and active-set tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Maintain the set of live connections and their request counts
//! - Signal when the set drains to empty (graceful shutdown)

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Bookkeeping for one live connection.
///
/// The transport stream itself is owned by the worker task; this handle only
/// carries what the rest of the system may observe.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Remote peer address.
    pub peer: SocketAddr,
    /// Requests currently being processed on this connection.
    pub outstanding: Arc<AtomicU64>,
}

/// Tracks active connections for graceful shutdown.
///
/// Insertions happen on accept, removals when a connection's guard drops; a
/// watch channel mirrors the set size so drain waiters need not poll.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    connections: Arc<DashMap<ConnectionId, ConnectionHandle>>,
    count: Arc<watch::Sender<usize>>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self {
            connections: Arc::new(DashMap::new()),
            count: Arc::new(count),
        }
    }

    /// Record a new active connection. Returns a guard that removes it on drop.
    pub fn register(&self, peer: SocketAddr) -> ConnectionGuard {
        let id = ConnectionId::new();
        let outstanding = Arc::new(AtomicU64::new(0));
        self.connections.insert(
            id,
            ConnectionHandle {
                peer,
                outstanding: Arc::clone(&outstanding),
            },
        );
        self.count.send_modify(|c| *c += 1);
        tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection registered");
        ConnectionGuard {
            id,
            outstanding,
            connections: Arc::clone(&self.connections),
            count: Arc::clone(&self.count),
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> usize {
        *self.count.borrow()
    }

    /// Wait until the active set is empty.
    pub async fn drained(&self) {
        let mut count = self.count.subscribe();
        // wait_for only errors when the sender is dropped, and we hold it.
        let _ = count.wait_for(|c| *c == 0).await;
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that tracks a connection's lifetime.
/// Removes the connection from the active set when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: ConnectionId,
    outstanding: Arc<AtomicU64>,
    connections: Arc<DashMap<ConnectionId, ConnectionHandle>>,
    count: Arc<watch::Sender<usize>>,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Note that a request started processing on this connection.
    pub fn begin_request(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    /// Note that a request finished (response written or abandoned).
    pub fn end_request(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }

    /// Requests currently in flight on this connection.
    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.connections.remove(&self.id);
        self.count.send_modify(|c| *c -= 1);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}
