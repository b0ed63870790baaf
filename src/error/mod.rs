//! Error handling
//!
//! Defines error types and handling for the presence relay.

pub mod handlers;
pub mod types;

pub use types::*;
