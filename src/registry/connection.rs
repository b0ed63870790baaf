//! Module `connection`
//!
//! The registry's view of a client connection: something with a stable id
//! that can be handed events and asked to close.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::DeliveryError;
use crate::protocol::ServerEvent;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id assigned when a connection is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Capability of a connection to be notified by the registry and router.
///
/// `emit` must not block: it either queues the event or reports why it
/// could not.
pub trait EventSink: Send + Sync {
    fn id(&self) -> ConnectionId;

    fn emit(&self, event: ServerEvent) -> Result<(), DeliveryError>;

    /// Tell the connection why it is being dropped, then close it.
    fn close(&self, reason: &str);
}

/// Handle to a live TCP session's outbound side.
///
/// Cheap to clone; every clone addresses the same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    addr: SocketAddr,
    outbound: mpsc::Sender<ServerEvent>,
    shutdown: Arc<Notify>,
}

impl ConnectionHandle {
    pub fn new(addr: SocketAddr, outbound: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            id: ConnectionId::next(),
            addr,
            outbound,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal fired when the registry force-closes this connection.
    pub fn shutdown_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }
}

impl EventSink for ConnectionHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn emit(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        self.outbound.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    fn close(&self, reason: &str) {
        // Best effort: a full queue still gets closed, just without the notice
        let _ = self.emit(ServerEvent::error(reason));
        // notify_one stores a permit, so the reader sees it even if not waiting yet
        self.shutdown.notify_one();
    }
}
