use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use capreel_types::{Session, SessionEvent, SessionMetadata, SessionSummary};

use crate::db::{AppendOutcome, Database};
use crate::error::Result;
use crate::locks::SessionLocks;

/// Thread-safe session store shared across server handlers.
///
/// The connection sits behind one mutex (SQLite is a single writer anyway);
/// the lock arena additionally pins the whole multi-statement append
/// critical section to its session, so same-session appends are serialized
/// even if the connection is ever replaced by a pool.
pub struct SessionStore {
    db: Mutex<Database>,
    locks: SessionLocks,
}

impl SessionStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open(db_path)?),
            locks: SessionLocks::new(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Mutex::new(Database::open_in_memory()?),
            locks: SessionLocks::new(),
        })
    }

    pub fn create_session(
        &self,
        session_id: &str,
        user_id: &str,
        metadata: &SessionMetadata,
        start_time: DateTime<Utc>,
    ) -> Result<()> {
        self.db
            .lock()
            .unwrap()
            .create_session(session_id, user_id, metadata, start_time)
    }

    pub fn append_events(
        &self,
        session_id: &str,
        batch_id: Option<&str>,
        events: &[SessionEvent],
    ) -> Result<AppendOutcome> {
        let cell = self.locks.cell(session_id);
        let _ordering = cell.lock().unwrap();
        self.db
            .lock()
            .unwrap()
            .append_events(session_id, batch_id, events)
    }

    pub fn mark_ended(&self, session_id: &str) -> Result<()> {
        let cell = self.locks.cell(session_id);
        let _ordering = cell.lock().unwrap();
        self.db.lock().unwrap().mark_ended(session_id)
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.db.lock().unwrap().get_session(session_id)
    }

    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        self.db.lock().unwrap().list_by_user(user_id)
    }

    pub fn event_count(&self, session_id: &str) -> Result<usize> {
        self.db.lock().unwrap().event_count(session_id)
    }
}
