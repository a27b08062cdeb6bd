use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::SessionEvent;

/// An ordered group of events flushed together from client to store.
///
/// Ephemeral: a batch is either fully accepted by the store or fully returned
/// to the client's pending buffer. `batch_id` is the idempotence key — a
/// retried delivery of an accepted batch is acknowledged without appending
/// anything twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    pub batch_id: String,
    pub events: Vec<SessionEvent>,
}

impl EventBatch {
    pub fn new(events: Vec<SessionEvent>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
