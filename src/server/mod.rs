//! Server core functionality
//!
//! This module contains the listener, the accept loop and the wiring of the
//! shared registry and router into each connection task.

pub mod core;

pub use self::core::Server;
