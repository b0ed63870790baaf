//! Module `events`
//!
//! Defines the event vocabulary exchanged between clients and the relay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events a client may submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Claim an identity for this connection.
    Register(String),
    /// Submit a direct message.
    Send(SendRequest),
}

/// Payload of a `send` event.
///
/// `from` is accepted for compatibility with older clients but never trusted:
/// the relay stamps the sender's registered identity instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, alias = "message")]
    pub body: String,
}

/// Events the relay emits to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The full, sorted set of registered identities.
    Presence(Vec<String>),
    MessageReceived(MessageReceived),
    MessageSent(MessageSent),
    MessageError(MessageError),
    /// A request from this connection was refused, or the connection is being closed.
    Error(ErrorNotice),
}

impl ServerEvent {
    pub fn error(reason: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorNotice {
            reason: reason.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceived {
    pub from: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSent {
    pub to: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageError {
    pub to: String,
    pub reason: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub reason: String,
}
