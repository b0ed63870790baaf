//! Module `state`
//!
//! Defines the `Client` struct holding one session's connection handle and
//! the identity it registered, if any.

use log::warn;
use std::net::SocketAddr;

use crate::protocol::ServerEvent;
use crate::registry::{ConnectionHandle, ConnectionId, EventSink, Identity};

/// Represents the state of a connected relay client.
pub struct Client {
    connection: ConnectionHandle,
    identity: Option<Identity>,
}

impl Client {
    pub fn new(connection: ConnectionHandle) -> Self {
        Self {
            connection,
            identity: None,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn connection(&self) -> &ConnectionHandle {
        &self.connection
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn addr(&self) -> SocketAddr {
        self.connection.addr()
    }

    /// Identity this session registered. The registry may since have handed
    /// it to another connection under the evict policy.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.identity.is_some()
    }

    // --------------------
    // Setter methods
    // --------------------

    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Queue an event for this client, logging if it cannot be queued.
    pub fn notify(&self, event: ServerEvent) {
        if let Err(e) = self.connection.emit(event) {
            warn!("Dropping event for {} ({}): {}", self.addr(), self.id(), e);
        }
    }
}
