use chrono::Utc;
use log::{debug, warn};
use std::sync::Arc;

use crate::error::{RouteError, ValidationError};
use crate::protocol::{MessageError, ServerEvent};
use crate::registry::{ConnectionHandle, EventSink, Identity, Registry};
use crate::router::Envelope;

/// Reason carried by `message-error` when the destination cannot be reached.
pub const UNREACHABLE_REASON: &str = "recipient unreachable";

/// Routes direct messages between registered connections.
pub struct Router<S: EventSink = ConnectionHandle> {
    registry: Arc<Registry<S>>,
    max_body_length: usize,
}

impl<S: EventSink> Router<S> {
    pub fn new(registry: Arc<Registry<S>>, max_body_length: usize) -> Self {
        Self {
            registry,
            max_body_length,
        }
    }

    pub fn registry(&self) -> &Arc<Registry<S>> {
        &self.registry
    }

    /// Delivers `body` from `sender` to the connection registered as `to`.
    ///
    /// On success the recipient gets `message-received` and the sender gets
    /// `message-sent`. On any failure the sender alone gets `message-error`
    /// and the recipient is not contacted. The `from` identity is whatever
    /// `sender` is registered as. Nothing is retried; the returned value only
    /// reports what happened.
    pub fn send(&self, sender: &S, to: &str, body: String) -> Result<Envelope, RouteError> {
        match self.deliver(sender, to, body) {
            Ok(envelope) => {
                debug!(
                    "Routed message {} -> {} ({} bytes)",
                    envelope.from(),
                    envelope.to(),
                    envelope.body().len()
                );
                // Recipient already has it; a lost confirmation is not rolled back
                if let Err(e) = sender.emit(envelope.sent_event()) {
                    warn!("Send confirmation to {} failed: {}", sender.id(), e);
                }
                Ok(envelope)
            }
            Err(err) => {
                debug!("Send from {} to {:?} failed: {}", sender.id(), to, err);
                let notice = ServerEvent::MessageError(MessageError {
                    to: to.to_string(),
                    reason: err.to_string(),
                    sent_at: Utc::now(),
                });
                if let Err(e) = sender.emit(notice) {
                    warn!("Send error notice to {} failed: {}", sender.id(), e);
                }
                Err(err)
            }
        }
    }

    fn deliver(&self, sender: &S, to: &str, body: String) -> Result<Envelope, RouteError> {
        let to = Identity::destination(to)?;
        if body.len() > self.max_body_length {
            return Err(ValidationError::BodyTooLong {
                max: self.max_body_length,
            }
            .into());
        }

        // Lookup and enqueue happen under the registry lock: a recipient is
        // either fully present or already gone.
        self.registry
            .route(sender.id(), to.as_str(), |from, recipient| -> Result<Envelope, RouteError> {
                let from = from.ok_or(ValidationError::NotRegistered)?.clone();
                let recipient =
                    recipient.ok_or_else(|| RouteError::Unreachable(to.to_string()))?;

                let envelope = Envelope::new(from, to.clone(), body);
                recipient.emit(envelope.received_event()).map_err(|e| {
                    warn!("Delivery to {} ({}) failed: {}", to, recipient.id(), e);
                    RouteError::Unreachable(to.to_string())
                })?;
                Ok(envelope)
            })
    }
}
