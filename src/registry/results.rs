//! Registry result types
//!
//! Defines result structures returned by registry operations.

use crate::error::DeliveryError;
use crate::registry::{ConnectionId, Identity};

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub identity: Identity,
    /// The connection that held the identity before and was closed
    pub evicted: Option<ConnectionId>,
    /// Presence set broadcast after the change
    pub presence: Vec<Identity>,
    /// Connections the presence broadcast could not reach
    pub undelivered: Vec<(ConnectionId, DeliveryError)>,
}

/// Result of an unregister that actually removed an entry
#[derive(Debug, Clone)]
pub struct Unregistration {
    pub identity: Identity,
    pub presence: Vec<Identity>,
    pub undelivered: Vec<(ConnectionId, DeliveryError)>,
}
