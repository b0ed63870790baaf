//! Relay wire protocol
//!
//! Every frame is one JSON object on its own line, shaped
//! `{"event": <name>, "data": <payload>}`.

pub mod events;
pub mod parser;
pub mod responses;

pub use events::{
    ClientEvent, ErrorNotice, MessageError, MessageReceived, MessageSent, SendRequest, ServerEvent,
};
pub use parser::parse_event;
pub use responses::encode_event;
