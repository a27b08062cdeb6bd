use std::sync::Arc;

use capreel_store::SessionStore;
use capreel_types::SessionEvent;
use tokio::sync::broadcast;

/// Fan-out hub for mirrored events.
///
/// One broadcast channel carries every mirrored event; watchers filter by
/// session id. Lagging observers lose messages — the channel is advisory,
/// so that is acceptable by design.
#[derive(Clone)]
pub struct MirrorHub {
    tx: broadcast::Sender<MirroredEvent>,
}

#[derive(Debug, Clone)]
pub struct MirroredEvent {
    pub session_id: String,
    pub event: SessionEvent,
}

impl MirrorHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn publish(&self, session_id: &str, event: SessionEvent) {
        // Error just means no watcher is subscribed right now
        let _ = self.tx.send(MirroredEvent {
            session_id: session_id.to_string(),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MirroredEvent> {
        self.tx.subscribe()
    }
}

impl Default for MirrorHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub mirror: MirrorHub,
}

impl AppState {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            mirror: MirrorHub::new(),
        }
    }

    /// Run a blocking store operation off the async worker threads.
    pub async fn with_store<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SessionStore) -> T + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| anyhow::anyhow!("store task failed: {}", e))
    }
}
