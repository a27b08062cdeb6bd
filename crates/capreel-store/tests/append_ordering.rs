use std::sync::Arc;
use std::thread;

use capreel_store::{AppendOutcome, SessionStore};
use capreel_types::{EventPayload, PointerAction, PointerPayload, SessionEvent, SessionMetadata};
use chrono::Utc;

fn batch(base_ts: u64, count: usize) -> Vec<SessionEvent> {
    (0..count)
        .map(|i| {
            SessionEvent::new(
                base_ts + i as u64,
                EventPayload::Pointer(PointerPayload {
                    x: (base_ts + i as u64) as i32,
                    y: 0,
                    action: PointerAction::Move,
                }),
            )
        })
        .collect()
}

#[test]
fn concurrent_appends_never_interleave_within_a_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SessionStore::open(&dir.path().join("capreel.db")).unwrap());

    let sessions = ["s-a", "s-b", "s-c"];
    for id in sessions {
        store
            .create_session(id, "user-1", &SessionMetadata::new(), Utc::now())
            .unwrap();
    }

    // Several writers per session, all racing. Each writer appends batches
    // whose events carry the writer id in the x coordinate, so interleaving
    // inside a batch would be visible after the fact.
    const WRITERS_PER_SESSION: usize = 4;
    const BATCHES_PER_WRITER: usize = 5;
    const BATCH_LEN: usize = 8;

    let mut handles = Vec::new();
    for session in sessions {
        for writer in 0..WRITERS_PER_SESSION {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for b in 0..BATCHES_PER_WRITER {
                    let base = (writer * 1_000 + b * BATCH_LEN) as u64;
                    let outcome = store.append_events(session, None, &batch(base, BATCH_LEN));
                    assert!(matches!(outcome, Ok(AppendOutcome::Applied(BATCH_LEN))));
                }
            }));
        }
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = WRITERS_PER_SESSION * BATCHES_PER_WRITER * BATCH_LEN;
    for session in sessions {
        let loaded = store.get_session(session).unwrap().unwrap();
        assert_eq!(loaded.events.len(), expected, "no events lost");

        // Every batch of BATCH_LEN consecutive stored events must come from
        // a single writer: batches are atomic, so timestamps inside each
        // window are consecutive.
        for window in loaded.events.chunks(BATCH_LEN) {
            let first = window[0].timestamp;
            for (i, event) in window.iter().enumerate() {
                assert_eq!(
                    event.timestamp,
                    first + i as u64,
                    "batch interleaved in session {}",
                    session
                );
            }
        }
    }
}

#[test]
fn retried_batch_after_lost_ack_is_counted_once() {
    let store = SessionStore::open_in_memory().unwrap();
    store
        .create_session("s-1", "user-1", &SessionMetadata::new(), Utc::now())
        .unwrap();

    let events = batch(0, 20);
    let id = uuid::Uuid::new_v4().to_string();

    assert_eq!(
        store.append_events("s-1", Some(&id), &events).unwrap(),
        AppendOutcome::Applied(20)
    );
    assert_eq!(
        store.append_events("s-1", Some(&id), &events).unwrap(),
        AppendOutcome::DuplicateBatch
    );
    assert_eq!(store.event_count("s-1").unwrap(), 20);
}
