//! In-memory `EventSink` used by unit tests.

use std::sync::{Arc, Mutex};

use crate::error::DeliveryError;
use crate::protocol::ServerEvent;
use crate::registry::{ConnectionId, EventSink};

#[derive(Debug, Clone)]
pub struct RecordingSink {
    id: ConnectionId,
    events: Arc<Mutex<Vec<ServerEvent>>>,
    close_reason: Arc<Mutex<Option<String>>>,
    fail_with: Option<DeliveryError>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            id: ConnectionId::next(),
            events: Arc::new(Mutex::new(Vec::new())),
            close_reason: Arc::new(Mutex::new(None)),
            fail_with: None,
        }
    }

    /// A sink whose every emit fails with `error`.
    pub fn failing(error: DeliveryError) -> Self {
        Self {
            fail_with: Some(error),
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn presence_updates(&self) -> Vec<Vec<String>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::Presence(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    /// Events other than presence updates.
    pub fn messages(&self) -> Vec<ServerEvent> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, ServerEvent::Presence(_)))
            .collect()
    }

    pub fn close_reason(&self) -> Option<String> {
        self.close_reason.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn emit(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        if let Some(error) = self.fail_with {
            return Err(error);
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn close(&self, reason: &str) {
        *self.close_reason.lock().unwrap() = Some(reason.to_string());
    }
}
