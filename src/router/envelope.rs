//! Module `envelope`
//!
//! The immutable record of one routed message.

use chrono::{DateTime, Utc};

use crate::protocol::{MessageReceived, MessageSent, ServerEvent};
use crate::registry::Identity;

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    from: Identity,
    to: Identity,
    body: String,
    sent_at: DateTime<Utc>,
}

impl Envelope {
    /// Stamps the message with the current server time.
    pub fn new(from: Identity, to: Identity, body: String) -> Self {
        Self {
            from,
            to,
            body,
            sent_at: Utc::now(),
        }
    }

    pub fn from(&self) -> &Identity {
        &self.from
    }

    pub fn to(&self) -> &Identity {
        &self.to
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    /// Event delivered to the recipient.
    pub fn received_event(&self) -> ServerEvent {
        ServerEvent::MessageReceived(MessageReceived {
            from: self.from.to_string(),
            body: self.body.clone(),
            sent_at: self.sent_at,
        })
    }

    /// Confirmation echoed to the sender.
    pub fn sent_event(&self) -> ServerEvent {
        ServerEvent::MessageSent(MessageSent {
            to: self.to.to_string(),
            body: self.body.clone(),
            sent_at: self.sent_at,
        })
    }
}
