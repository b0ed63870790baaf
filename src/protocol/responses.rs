//! Outbound frame encoding

use crate::error::ProtocolError;
use crate::protocol::ServerEvent;

/// Encode an event as a newline-terminated frame
pub fn encode_event(event: &ServerEvent) -> Result<String, ProtocolError> {
    let mut frame = serde_json::to_string(event).map_err(ProtocolError::Encode)?;
    frame.push('\n');
    Ok(frame)
}
