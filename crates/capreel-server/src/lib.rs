// Server surface: REST API over the session store plus the best-effort
// TCP mirror channel for live observers

mod api;
mod mirror;
mod state;

pub mod config;

pub use config::ServerConfig;
pub use state::{AppState, MirrorHub};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use capreel_store::SessionStore;
use tokio::net::TcpListener;
use tracing::info;

/// Bound listeners plus the state they serve. Lets callers (CLI, tests)
/// bind on ephemeral ports and learn the actual addresses before serving.
pub struct Server {
    pub http_addr: SocketAddr,
    pub mirror_addr: SocketAddr,
    state: AppState,
    http_listener: TcpListener,
    mirror_listener: TcpListener,
}

impl Server {
    pub async fn bind(config: &ServerConfig, store: Arc<SessionStore>) -> anyhow::Result<Self> {
        let http_listener = TcpListener::bind(&config.http_addr)
            .await
            .with_context(|| format!("failed to bind HTTP listener on {}", config.http_addr))?;
        let mirror_listener = TcpListener::bind(&config.mirror_addr)
            .await
            .with_context(|| format!("failed to bind mirror listener on {}", config.mirror_addr))?;

        Ok(Self {
            http_addr: http_listener.local_addr()?,
            mirror_addr: mirror_listener.local_addr()?,
            state: AppState::new(store),
            http_listener,
            mirror_listener,
        })
    }

    /// Run both loops until one fails.
    pub async fn serve(self) -> anyhow::Result<()> {
        let app = api::router(self.state.clone());
        info!(http = %self.http_addr, mirror = %self.mirror_addr, "capreel server listening");

        tokio::select! {
            result = async { axum::serve(self.http_listener, app).await } => {
                result.context("HTTP server terminated")
            }
            _ = mirror::run_acceptor(self.mirror_listener, self.state) => {
                Ok(())
            }
        }
    }

    /// Detach into background tasks; used by tests and the demo flow.
    pub fn spawn(self) -> (SocketAddr, SocketAddr) {
        let http_addr = self.http_addr;
        let mirror_addr = self.mirror_addr;
        let app = api::router(self.state.clone());
        let state = self.state;
        tokio::spawn(async move {
            let _ = axum::serve(self.http_listener, app).await;
        });
        tokio::spawn(mirror::run_acceptor(self.mirror_listener, state));
        (http_addr, mirror_addr)
    }
}

/// Open the store at the configured path and serve until terminated.
pub async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let store = Arc::new(
        SessionStore::open(&config.db_path)
            .map_err(|e| anyhow::anyhow!("failed to open store {}: {}", config.db_path.display(), e))?,
    );
    Server::bind(&config, store).await?.serve().await
}
