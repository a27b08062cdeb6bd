use capreel_types::{
    EventPayload, PointerAction, PointerPayload, SessionEvent, SessionMetadata,
};

/// Bare stream of `count` pointer moves starting at t=0, spaced
/// `interval_ms` apart. No snapshot baseline — batching and transport
/// layers treat events as opaque, so tests that only count deliveries use
/// this flat shape.
pub fn pointer_stream(count: usize, interval_ms: u64) -> Vec<SessionEvent> {
    (0..count)
        .map(|i| {
            SessionEvent::new(
                i as u64 * interval_ms,
                EventPayload::Pointer(PointerPayload {
                    x: i as i32,
                    y: (i * 2) as i32,
                    action: PointerAction::Move,
                }),
            )
        })
        .collect()
}

/// Metadata in the shape capture clients attach on session start.
pub fn sample_metadata() -> SessionMetadata {
    let mut metadata = SessionMetadata::new();
    metadata.insert(
        "userAgent".to_string(),
        serde_json::Value::String("capreel-tests/0.1".to_string()),
    );
    metadata.insert("screenWidth".to_string(), serde_json::json!(1280));
    metadata.insert("screenHeight".to_string(), serde_json::json!(720));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_stream_spacing() {
        let events = pointer_stream(120, 50);
        assert_eq!(events.len(), 120);
        assert_eq!(events.last().unwrap().timestamp, 119 * 50);
    }
}
