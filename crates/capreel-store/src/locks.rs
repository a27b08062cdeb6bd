use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Arena of per-session ordering locks.
///
/// Appends for the same session must never interleave; appends for different
/// sessions are independent. Holding one global lock would serialize every
/// writer, so each session id gets its own lightweight mutex, created on
/// first use.
#[derive(Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock cell for a session id. Callers lock the returned mutex for the
    /// duration of the append critical section.
    pub fn cell(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
