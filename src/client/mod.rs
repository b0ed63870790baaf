//! Client session management
//!
//! Handles one connection from accept to close: inbound frames, the
//! outbound writer, and registry cleanup.

pub mod handler;
pub mod operations;
pub mod state;

pub use handler::handle_client;
pub use state::Client;
