//! Error handlers
//!
//! Logging and client-facing wording for relay errors.

use crate::error::types::RelayError;
use log::{debug, error, warn};

/// Log a relay error at a level matching its severity
pub fn handle_error(err: &RelayError) {
    match err {
        // Misses and refused registrations are ordinary traffic
        RelayError::Route(_) | RelayError::Registry(_) => debug!("{}", err),
        RelayError::Protocol(_) => warn!("{}", err),
        RelayError::Config(_) | RelayError::IoError(_) => error!("{}", err),
    }
}

/// Reason string sent to the client that caused the error
pub fn client_reason(err: &RelayError) -> String {
    match err {
        RelayError::Registry(e) => e.to_string(),
        RelayError::Route(e) => e.to_string(),
        RelayError::Protocol(e) => e.to_string(),
        RelayError::Config(_) | RelayError::IoError(_) => "internal server error".to_string(),
    }
}
