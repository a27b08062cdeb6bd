use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use capreel_types::{EventBatch, Session, SessionEvent, SessionMetadata, SessionSummary};

use crate::error::{Error, Result};
use crate::transport::SessionTransport;

#[derive(Default)]
struct MockSession {
    user_id: String,
    events: Vec<SessionEvent>,
    /// (batch_id, len) for every attempt that reached the store.
    attempts: Vec<(String, usize)>,
    /// Sizes of batches actually applied, in order.
    applied: Vec<usize>,
    seen_batches: HashSet<String>,
    ended: bool,
}

/// In-memory stand-in for the server, with scriptable failures:
/// `fail_next_sends` drops sends before they reach the store,
/// `lose_next_acks` applies the batch but loses the acknowledgment.
#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<HashMap<String, MockSession>>,
    call_log: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    fail_sends: AtomicUsize,
    lose_acks: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_session(&self, session_id: &str) {
        self.sessions.lock().unwrap().insert(
            session_id.to_string(),
            MockSession {
                user_id: "test-user".to_string(),
                ..MockSession::default()
            },
        );
    }

    pub fn fail_next_sends(&self, count: usize) {
        self.fail_sends.store(count, Ordering::SeqCst);
    }

    pub fn lose_next_acks(&self, count: usize) {
        self.lose_acks.store(count, Ordering::SeqCst);
    }

    pub fn batch_sizes(&self, session_id: &str) -> Vec<usize> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.applied.clone())
            .unwrap_or_default()
    }

    pub fn batch_ids(&self, session_id: &str) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.attempts.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn stored_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.events.len())
            .unwrap_or(0)
    }

    pub fn ended(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|s| s.ended)
            .unwrap_or(false)
    }

    pub fn call_log(&self) -> Vec<String> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn assert_order_preserved(&self, session_id: &str) {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions.get(session_id).expect("session exists");
        assert!(
            session
                .events
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp),
            "stored events out of order"
        );
    }

    fn log(&self, entry: impl Into<String>) {
        self.call_log.lock().unwrap().push(entry.into());
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl SessionTransport for MockTransport {
    fn start_session(&self, user_id: &str, _metadata: &SessionMetadata) -> Result<String> {
        let session_id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sessions.lock().unwrap().insert(
            session_id.clone(),
            MockSession {
                user_id: user_id.to_string(),
                ..MockSession::default()
            },
        );
        self.log("start");
        Ok(session_id)
    }

    fn send_event_batch(&self, session_id: &str, batch: &EventBatch) -> Result<()> {
        if Self::take(&self.fail_sends) {
            self.log("append-unreachable");
            return Err(Error::Transport("store unreachable".to_string()));
        }

        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        session
            .attempts
            .push((batch.batch_id.clone(), batch.len()));

        if session.seen_batches.insert(batch.batch_id.clone()) {
            session.events.extend(batch.events.iter().cloned());
            session.applied.push(batch.len());
        }
        drop(sessions);

        if Self::take(&self.lose_acks) {
            self.log("append-ack-lost");
            return Err(Error::Transport("acknowledgment lost".to_string()));
        }

        self.log(format!("append:{}", batch.len()));
        Ok(())
    }

    fn end_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        session.ended = true;
        drop(sessions);
        self.log("end");
        Ok(())
    }

    fn fetch_session(&self, session_id: &str) -> Result<Session> {
        let sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        Ok(Session {
            session_id: session_id.to_string(),
            user_id: session.user_id.clone(),
            events: session.events.clone(),
            start_time: chrono_epoch(),
            end_time: None,
            metadata: SessionMetadata::new(),
        })
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .iter()
            .filter(|(_, s)| s.user_id == user_id)
            .map(|(id, s)| SessionSummary {
                session_id: id.clone(),
                user_id: s.user_id.clone(),
                start_time: chrono_epoch(),
                end_time: None,
                event_count: s.events.len(),
                metadata: SessionMetadata::new(),
            })
            .collect())
    }
}

fn chrono_epoch() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::from_timestamp(0, 0).expect("valid epoch")
}
