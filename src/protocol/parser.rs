//! Inbound frame parsing
//!
//! Turns one line received from a client into a `ClientEvent`.

use crate::error::ProtocolError;
use crate::protocol::ClientEvent;

/// Parse a single frame. Trailing `\r\n` or `\n` is ignored.
pub fn parse_event(frame: &str, max_frame_length: usize) -> Result<ClientEvent, ProtocolError> {
    let trimmed = frame.trim_end_matches(['\r', '\n']);
    if trimmed.len() > max_frame_length {
        return Err(ProtocolError::FrameTooLong {
            max: max_frame_length,
        });
    }

    serde_json::from_str(trimmed).map_err(ProtocolError::Malformed)
}
