use std::sync::Arc;

use anyhow::Result;
use owo_colors::OwoColorize;

use capreel_client::{HttpTransport, Recorder, RecorderConfig, SessionTransport};
use capreel_types::{
    EventPayload, PointerAction, PointerPayload, ScrollPayload, SessionEvent, SessionMetadata,
    SnapshotPayload,
};

const VIEWPORT: (u32, u32) = (1280, 720);

/// Record a synthetic pointer-path session through the real capture stack:
/// Recorder -> batcher -> HTTP transport, with the live mirror attached.
pub fn handle(server: &str, mirror_addr: &str, user: &str, event_count: usize) -> Result<()> {
    let transport: Arc<dyn SessionTransport> = Arc::new(HttpTransport::new(server));

    let mut metadata = SessionMetadata::new();
    metadata.insert("demo".to_string(), serde_json::json!(true));
    metadata.insert("screenWidth".to_string(), serde_json::json!(VIEWPORT.0));
    metadata.insert("screenHeight".to_string(), serde_json::json!(VIEWPORT.1));

    let recorder = Recorder::start(
        transport.clone(),
        user,
        &metadata,
        RecorderConfig {
            batcher: Default::default(),
            mirror_addr: Some(mirror_addr.to_string()),
        },
    )
    .map_err(|e| anyhow::anyhow!("failed to start recording: {}", e))?;
    let session_id = recorder.session_id().to_string();
    println!("Recording demo session {}", session_id.bold());

    let sink = recorder.sink();
    for event in synthetic_session(event_count) {
        sink.push(event);
    }

    recorder
        .stop()
        .map_err(|e| anyhow::anyhow!("failed to stop recording: {}", e))?;

    println!(
        "  captured {} events, {} acknowledged",
        recorder.captured(),
        recorder.acknowledged()
    );

    // Authoritative count from the store, not local memory
    let stored = transport
        .fetch_session(&session_id)
        .map_err(|e| anyhow::anyhow!("failed to fetch session back: {}", e))?;
    println!(
        "{} session {} holds {} events",
        "Done:".green(),
        session_id,
        stored.events.len()
    );
    println!("  replay it with: capreel export {}", session_id);

    Ok(())
}

/// Snapshot baseline, a pointer sweep across the viewport, a click, and a
/// scroll — spaced 50ms apart.
fn synthetic_session(event_count: usize) -> Vec<SessionEvent> {
    let (width, height) = VIEWPORT;
    let mut events = vec![SessionEvent::new(
        0,
        EventPayload::FullSnapshot(SnapshotPayload {
            width,
            height,
            background: Some("#1e1e28".to_string()),
            document: serde_json::json!({ "demo": true }),
        }),
    )];

    for i in 1..event_count {
        let ts = i as u64 * 50;
        let payload = match i % 16 {
            7 => EventPayload::Pointer(PointerPayload {
                x: (i * 23 % width as usize) as i32,
                y: (i * 11 % height as usize) as i32,
                action: PointerAction::Down,
            }),
            8 => EventPayload::Pointer(PointerPayload {
                x: (i * 23 % width as usize) as i32,
                y: (i * 11 % height as usize) as i32,
                action: PointerAction::Up,
            }),
            15 => EventPayload::Scroll(ScrollPayload {
                x: 0,
                y: (i * 4) as i32,
            }),
            _ => EventPayload::Pointer(PointerPayload {
                x: (i * 23 % width as usize) as i32,
                y: (i * 11 % height as usize) as i32,
                action: PointerAction::Move,
            }),
        };
        events.push(SessionEvent::new(ts, payload));
    }

    events
}
