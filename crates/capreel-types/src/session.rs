use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::event::SessionEvent;

/// Open key-value metadata attached to a session at start (user agent,
/// viewport, page url, ...).
pub type SessionMetadata = Map<String, Value>;

/// Complete recording session, the canonical store-side document.
///
/// Field names are the persisted contract (`sessionId`, `userId`, `events`,
/// `startTime`, `endTime`, `metadata`); replay consumers depend on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,

    pub user_id: String,

    /// Ordered, append-only event log. Grows until the session ends.
    pub events: Vec<SessionEvent>,

    pub start_time: DateTime<Utc>,

    /// Set exactly once when the session ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl Session {
    /// Recording duration in milliseconds: the timestamp of the last event.
    /// Zero for a session with no events.
    pub fn duration_ms(&self) -> u64 {
        self.events.last().map(|e| e.timestamp).unwrap_or(0)
    }
}

/// Session listing entry: everything but the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,

    pub user_id: String,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Authoritative stored event count. Lets a client reconcile its local
    /// acknowledged count against the store.
    pub event_count: usize,

    #[serde(default)]
    pub metadata: SessionMetadata,
}
