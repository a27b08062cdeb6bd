use serde::{Deserialize, Serialize};

use crate::event::SessionEvent;
use crate::session::SessionMetadata;

// Request/response bodies for the REST surface and the line-delimited
// mirror protocol. Shared by server and client so the wire shape has one
// definition.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub user_id: String,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEventsRequest {
    pub events: Vec<SessionEvent>,
    /// Idempotence key. Absent means at-least-once delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Client -> server lines on the live-mirror channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MirrorClientMessage {
    /// Mirror one captured event for live observers. Best-effort; never
    /// part of the authoritative log.
    #[serde(rename_all = "camelCase")]
    RecordEvent {
        session_id: String,
        event: SessionEvent,
    },

    /// Subscribe to mirrored events for one session.
    #[serde(rename_all = "camelCase")]
    WatchSession { session_id: String },
}

/// Server -> client lines on the live-mirror channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MirrorServerMessage {
    EventSaved,

    EventError { error: String },

    /// A mirrored event, delivered to watchers of its session.
    #[serde(rename_all = "camelCase")]
    Event {
        session_id: String,
        event: SessionEvent,
    },
}
