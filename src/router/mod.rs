//! Message routing
//!
//! Resolves a destination identity through the registry and delivers the
//! message, or tells the sender it could not.

pub mod core;
pub mod envelope;

pub use self::core::{Router, UNREACHABLE_REASON};
pub use envelope::Envelope;
