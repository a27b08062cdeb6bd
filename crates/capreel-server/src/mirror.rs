use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use capreel_types::{MirrorClientMessage, MirrorServerMessage};

use crate::state::AppState;

/// Accept loop for the live-mirror channel: newline-delimited JSON both
/// ways. Mirrored events are fanned out to watchers and acknowledged, but
/// never persisted — the authoritative log is built exclusively from batch
/// deliveries on the REST surface.
pub async fn run_acceptor(listener: TcpListener, state: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!(%addr, "mirror connection accepted");
                let st = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_conn(stream, st).await {
                        debug!(%addr, error = %e, "mirror connection closed");
                    }
                });
            }
            Err(e) => error!(error = %e, "mirror accept failed"),
        }
    }
}

async fn handle_conn(stream: TcpStream, state: AppState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

    let writer_handle = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.write_all(b"\n").await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MirrorClientMessage>(&line) {
            Ok(MirrorClientMessage::RecordEvent { session_id, event }) => {
                state.mirror.publish(&session_id, event);
                send_line(&line_tx, &MirrorServerMessage::EventSaved).await;
            }
            Ok(MirrorClientMessage::WatchSession { session_id }) => {
                info!(%session_id, "mirror watcher attached");
                spawn_watcher(&state, session_id, line_tx.clone());
            }
            Err(e) => {
                warn!(error = %e, "unparseable mirror message");
                send_line(
                    &line_tx,
                    &MirrorServerMessage::EventError {
                        error: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    drop(line_tx);
    let _ = writer_handle.await;
    Ok(())
}

/// Forward mirrored events for one session to this connection until the
/// connection goes away. A lagged receiver just skips ahead: delivery is
/// best-effort.
fn spawn_watcher(state: &AppState, session_id: String, line_tx: mpsc::Sender<String>) {
    let mut rx = state.mirror.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(mirrored) => {
                    if mirrored.session_id != session_id {
                        continue;
                    }
                    let message = MirrorServerMessage::Event {
                        session_id: mirrored.session_id,
                        event: mirrored.event,
                    };
                    let Ok(line) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if line_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(%session_id, skipped, "mirror watcher lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn send_line(line_tx: &mpsc::Sender<String>, message: &MirrorServerMessage) {
    if let Ok(line) = serde_json::to_string(message) {
        let _ = line_tx.send(line).await;
    }
}
