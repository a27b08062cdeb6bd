use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Mutex;

use tracing::{debug, warn};

use capreel_types::{MirrorClientMessage, MirrorServerMessage, SessionEvent};

/// Best-effort live mirror: one newline-delimited JSON message per captured
/// event over a plain TCP connection.
///
/// Never authoritative — the durable log is built from batch deliveries
/// alone. Connection and delivery failures are logged and swallowed; a
/// failed write disables the mirror for the rest of the session rather than
/// disturbing capture.
pub struct MirrorSender {
    stream: Mutex<Option<TcpStream>>,
}

impl MirrorSender {
    pub fn connect(addr: &str) -> Self {
        let stream = match TcpStream::connect(addr) {
            Ok(stream) => {
                spawn_ack_reader(&stream);
                Some(stream)
            }
            Err(e) => {
                warn!(addr, error = %e, "live mirror unavailable");
                None
            }
        };
        Self {
            stream: Mutex::new(stream),
        }
    }

    /// Mirror one event. Returns immediately; any failure downgrades the
    /// mirror to inert.
    pub fn send(&self, session_id: &str, event: &SessionEvent) {
        let message = MirrorClientMessage::RecordEvent {
            session_id: session_id.to_string(),
            event: event.clone(),
        };
        let line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "mirror event not serializable");
                return;
            }
        };

        let mut guard = self.stream.lock().unwrap();
        if let Some(stream) = guard.as_mut() {
            if let Err(e) = stream
                .write_all(line.as_bytes())
                .and_then(|_| stream.write_all(b"\n"))
            {
                warn!(error = %e, "live mirror disconnected");
                *guard = None;
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().unwrap().is_some()
    }
}

/// Acknowledgments are advisory; drain them off the capture path and log
/// server-side mirror errors.
fn spawn_ack_reader(stream: &TcpStream) {
    let Ok(reader) = stream.try_clone() else {
        return;
    };
    let _ = std::thread::Builder::new()
        .name("capreel-mirror-ack".to_string())
        .spawn(move || {
            let reader = BufReader::new(reader);
            for line in reader.lines() {
                let Ok(line) = line else { break };
                match serde_json::from_str::<MirrorServerMessage>(&line) {
                    Ok(MirrorServerMessage::EventSaved) => {
                        debug!("mirror event acknowledged");
                    }
                    Ok(MirrorServerMessage::EventError { error }) => {
                        warn!(%error, "mirror event rejected");
                    }
                    Ok(MirrorServerMessage::Event { .. }) => {}
                    Err(e) => {
                        debug!(error = %e, "unparseable mirror acknowledgment");
                    }
                }
            }
        });
}
