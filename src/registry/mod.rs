//! Connection registry
//!
//! Owns the authoritative identity → connection table and the presence
//! broadcast that follows every change to it.

pub mod connection;
pub mod core;
pub mod identity;
pub mod results;

pub use connection::{ConnectionHandle, ConnectionId, EventSink};
pub use self::core::Registry;
pub use identity::Identity;
pub use results::{Registration, Unregistration};
