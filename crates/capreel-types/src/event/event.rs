use serde::{Deserialize, Serialize};

use super::payload::EventPayload;

// NOTE: Schema Design Goals
//
// 1. Wire compatibility: the serialized shape is the on-disk/over-the-wire
//    contract (`{"type": ..., "timestamp": ..., "data": ...}`) that replay
//    consumers depend on. Field names never change without a migration.
//
// 2. Opacity where it matters: capture sources attach arbitrary scene data
//    (snapshot documents, custom payloads) as raw JSON values. The replay
//    side only interprets the variants it knows how to materialize.
//
// 3. Ordering: `timestamp` is milliseconds relative to session start and is
//    monotonically non-decreasing within a session. Storage assigns the
//    authoritative per-session sequence on append; the timestamp drives
//    replay timing, not ordering.

/// A single captured interaction event.
///
/// Serialized form: `{"timestamp": 120, "type": "pointer", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Milliseconds since session start. Non-decreasing within a session.
    pub timestamp: u64,

    /// Event type and content (flattened enum).
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl SessionEvent {
    pub fn new(timestamp: u64, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }

    /// True for events that fully re-establish visual state, superseding all
    /// prior incremental deltas.
    pub fn is_full_snapshot(&self) -> bool {
        matches!(self.payload, EventPayload::FullSnapshot(_))
    }

    /// Stable type-tag string, also used as the `kind` column in storage.
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}
