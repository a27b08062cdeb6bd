pub mod demo;
pub mod export;
pub mod serve;
pub mod sessions;
pub mod show;

use anyhow::Result;
use std::path::PathBuf;

use capreel_server::config::resolve_data_dir;
use capreel_server::ServerConfig;

/// Server config from `<data_dir>/config.toml`; written with defaults on
/// first use so every command resolves the same database file.
pub fn load_server_config(explicit_data_dir: Option<&str>) -> Result<ServerConfig> {
    let data_dir = resolve_data_dir(explicit_data_dir)?;
    std::fs::create_dir_all(&data_dir)?;

    let config_path = data_dir.join("config.toml");
    if config_path.exists() {
        return ServerConfig::load_from(&config_path);
    }

    let config = ServerConfig::with_defaults(explicit_data_dir)?;
    config.save_to(&config_path)?;
    Ok(config)
}

pub fn resolve_db_path(explicit_data_dir: Option<&str>) -> Result<PathBuf> {
    Ok(load_server_config(explicit_data_dir)?.db_path)
}
