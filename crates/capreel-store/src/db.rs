use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use capreel_types::{EventPayload, Session, SessionEvent, SessionMetadata, SessionSummary};

use crate::error::{Error, Result};

// NOTE: Database Design Rationale
//
// Why one events table instead of a JSON events column?
// - Appends become INSERTs with a contiguous per-session seq, so arrival
//   order survives restarts and concurrent writers without rewriting the
//   whole document (the original store used an in-place array $push)
// - Listing sessions never touches event rows (the expensive part)
//
// Why a batches table?
// - A client that lost an ack resends the same batch id; the dedup row lets
//   the store acknowledge the resend without appending anything twice
// - A batch with no id is accepted as-is: at-least-once, caller's choice
//
// Why TEXT timestamps?
// - RFC 3339 strings sort correctly, survive schema dumps, and match how
//   the session document is serialized on the wire

/// Outcome of an `append_events` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Events were appended; count included.
    Applied(usize),
    /// The batch id was already recorded; nothing was appended.
    DuplicateBatch,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                start_ts TEXT NOT NULL,
                end_ts TEXT,
                metadata TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS events (
                session_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                kind TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (session_id, seq),
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE TABLE IF NOT EXISTS batches (
                session_id TEXT NOT NULL,
                batch_id TEXT NOT NULL,
                event_count INTEGER NOT NULL,
                accepted_at TEXT NOT NULL,
                PRIMARY KEY (session_id, batch_id),
                FOREIGN KEY (session_id) REFERENCES sessions(id)
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id, start_ts DESC);
            "#,
        )?;

        Ok(())
    }

    /// Insert a new session with an empty event log and no end time.
    pub fn create_session(
        &self,
        session_id: &str,
        user_id: &str,
        metadata: &SessionMetadata,
        start_time: DateTime<Utc>,
    ) -> Result<()> {
        let metadata_json = serde_json::to_string(metadata)?;
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO sessions (id, user_id, start_ts, metadata)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                session_id,
                user_id,
                start_time.to_rfc3339(),
                metadata_json
            ],
        )?;

        if inserted == 0 {
            return Err(Error::DuplicateSession(session_id.to_string()));
        }

        Ok(())
    }

    /// Atomically append an ordered batch of events to a session's log.
    ///
    /// The whole batch is applied or none of it is. A `batch_id` that was
    /// already accepted yields `AppendOutcome::DuplicateBatch` and appends
    /// nothing — safe for client retries after a lost acknowledgment. A
    /// `None` batch id skips dedup entirely (at-least-once delivery).
    pub fn append_events(
        &self,
        session_id: &str,
        batch_id: Option<&str>,
        events: &[SessionEvent],
    ) -> Result<AppendOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }

        if let Some(batch_id) = batch_id {
            let seen: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM batches WHERE session_id = ?1 AND batch_id = ?2",
                    params![session_id, batch_id],
                    |row| row.get(0),
                )
                .optional()?;
            if seen.is_some() {
                return Ok(AppendOutcome::DuplicateBatch);
            }
        }

        let next_seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM events WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO events (session_id, seq, kind, timestamp_ms, payload)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for (offset, event) in events.iter().enumerate() {
                let payload_json = serde_json::to_string(&event.payload)?;
                stmt.execute(params![
                    session_id,
                    next_seq + offset as i64,
                    event.kind(),
                    event.timestamp as i64,
                    payload_json
                ])?;
            }
        }

        if let Some(batch_id) = batch_id {
            tx.execute(
                r#"
                INSERT INTO batches (session_id, batch_id, event_count, accepted_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    session_id,
                    batch_id,
                    events.len() as i64,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }

        tx.commit()?;
        Ok(AppendOutcome::Applied(events.len()))
    }

    /// Set the session's end time. A second call is a no-op, not an error —
    /// end-session calls are retried by clients.
    pub fn mark_ended(&self, session_id: &str) -> Result<()> {
        let exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }

        self.conn.execute(
            "UPDATE sessions SET end_ts = ?1 WHERE id = ?2 AND end_ts IS NULL",
            params![Utc::now().to_rfc3339(), session_id],
        )?;

        Ok(())
    }

    /// Load the full session document, event log included.
    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let head = self
            .conn
            .query_row(
                "SELECT id, user_id, start_ts, end_ts, metadata FROM sessions WHERE id = ?1",
                [session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, start_ts, end_ts, metadata_json)) = head else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT timestamp_ms, payload
            FROM events
            WHERE session_id = ?1
            ORDER BY seq
            "#,
        )?;
        let rows = stmt
            .query_map([session_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for (timestamp_ms, payload_json) in rows {
            let payload: EventPayload = serde_json::from_str(&payload_json)?;
            events.push(SessionEvent::new(timestamp_ms as u64, payload));
        }

        Ok(Some(Session {
            session_id: id,
            user_id,
            events,
            start_time: parse_ts(&start_ts)?,
            end_time: end_ts.as_deref().map(parse_ts).transpose()?,
            metadata: serde_json::from_str(&metadata_json)?,
        }))
    }

    /// List a user's sessions, newest first, event logs omitted.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.user_id, s.start_ts, s.end_ts, s.metadata,
                   (SELECT COUNT(*) FROM events e WHERE e.session_id = s.id)
            FROM sessions s
            WHERE s.user_id = ?1
            ORDER BY s.start_ts DESC
            "#,
        )?;

        let rows = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (id, user_id, start_ts, end_ts, metadata_json, event_count) in rows {
            summaries.push(SessionSummary {
                session_id: id,
                user_id,
                start_time: parse_ts(&start_ts)?,
                end_time: end_ts.as_deref().map(parse_ts).transpose()?,
                event_count: event_count as usize,
                metadata: serde_json::from_str(&metadata_json)?,
            });
        }

        Ok(summaries)
    }

    /// Stored event count for one session.
    pub fn event_count(&self, session_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1",
            [session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capreel_types::{PointerAction, PointerPayload, ScrollPayload, SnapshotPayload};

    fn sample_events(count: usize) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::new(
            0,
            EventPayload::FullSnapshot(SnapshotPayload {
                width: 640,
                height: 480,
                background: None,
                document: serde_json::Value::Null,
            }),
        )];
        for i in 1..count {
            events.push(SessionEvent::new(
                i as u64 * 50,
                EventPayload::Pointer(PointerPayload {
                    x: i as i32,
                    y: i as i32 * 2,
                    action: PointerAction::Move,
                }),
            ));
        }
        events
    }

    fn create(db: &Database, id: &str) {
        db.create_session(id, "user-1", &SessionMetadata::new(), Utc::now())
            .unwrap();
    }

    #[test]
    fn test_create_then_duplicate_fails() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        let err = db
            .create_session("s-1", "user-2", &SessionMetadata::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSession(_)));
    }

    #[test]
    fn test_append_preserves_order() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        let events = sample_events(5);
        db.append_events("s-1", Some("b-1"), &events[..3]).unwrap();
        db.append_events("s-1", Some("b-2"), &events[3..]).unwrap();

        let session = db.get_session("s-1").unwrap().unwrap();
        assert_eq!(session.events.len(), 5);
        let timestamps: Vec<u64> = session.events.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![0, 50, 100, 150, 200]);
        assert!(session.events[0].is_full_snapshot());
    }

    #[test]
    fn test_append_to_missing_session() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .append_events("nope", None, &sample_events(1))
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[test]
    fn test_batch_resend_is_deduplicated() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        let events = sample_events(4);
        let first = db.append_events("s-1", Some("b-1"), &events).unwrap();
        assert_eq!(first, AppendOutcome::Applied(4));

        // Client lost the ack and resends the same batch
        let second = db.append_events("s-1", Some("b-1"), &events).unwrap();
        assert_eq!(second, AppendOutcome::DuplicateBatch);
        assert_eq!(db.event_count("s-1").unwrap(), 4);
    }

    #[test]
    fn test_unkeyed_batches_are_at_least_once() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        let events = sample_events(2);
        db.append_events("s-1", None, &events).unwrap();
        db.append_events("s-1", None, &events).unwrap();
        assert_eq!(db.event_count("s-1").unwrap(), 4);
    }

    #[test]
    fn test_mark_ended_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        db.mark_ended("s-1").unwrap();
        let first_end = db.get_session("s-1").unwrap().unwrap().end_time.unwrap();

        db.mark_ended("s-1").unwrap();
        let second_end = db.get_session("s-1").unwrap().unwrap().end_time.unwrap();
        assert_eq!(first_end, second_end);

        assert!(matches!(
            db.mark_ended("missing").unwrap_err(),
            Error::SessionNotFound(_)
        ));
    }

    #[test]
    fn test_list_by_user_omits_events() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");
        create(&db, "s-2");
        db.create_session("other", "user-9", &SessionMetadata::new(), Utc::now())
            .unwrap();

        db.append_events("s-1", None, &sample_events(3)).unwrap();

        let summaries = db.list_by_user("user-1").unwrap();
        assert_eq!(summaries.len(), 2);
        let s1 = summaries
            .iter()
            .find(|s| s.session_id == "s-1")
            .expect("s-1 listed");
        assert_eq!(s1.event_count, 3);
    }

    #[test]
    fn test_get_missing_session() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_session("missing").unwrap().is_none());
    }

    #[test]
    fn test_scroll_payload_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        create(&db, "s-1");

        let event = SessionEvent::new(10, EventPayload::Scroll(ScrollPayload { x: 3, y: -40 }));
        db.append_events("s-1", None, &[event]).unwrap();

        let session = db.get_session("s-1").unwrap().unwrap();
        match &session.events[0].payload {
            EventPayload::Scroll(s) => {
                assert_eq!(s.x, 3);
                assert_eq!(s.y, -40);
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }
}
