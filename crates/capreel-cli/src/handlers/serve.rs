use anyhow::Result;
use tracing_subscriber::EnvFilter;

use capreel_server::ServerConfig;

use super::load_server_config;

pub fn handle(
    data_dir: Option<&str>,
    addr: Option<String>,
    mirror_addr: Option<String>,
) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let base = load_server_config(data_dir)?;
    let config = ServerConfig {
        http_addr: addr.unwrap_or(base.http_addr),
        mirror_addr: mirror_addr.unwrap_or(base.mirror_addr),
        db_path: base.db_path,
    };

    tokio::runtime::Runtime::new()?.block_on(capreel_server::serve(config))
}
