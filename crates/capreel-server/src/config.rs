use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolve the capreel data directory based on priority:
/// 1. Explicit path
/// 2. CAPREEL_PATH environment variable
/// 3. XDG data directory (recommended default)
/// 4. ~/.capreel (fallback for systems without XDG)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("CAPREEL_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("capreel"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".capreel"));
    }

    anyhow::bail!("Could not determine data directory: no HOME or XDG data directory found")
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// REST listener address.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Live-mirror TCP listener address.
    #[serde(default = "default_mirror_addr")]
    pub mirror_addr: String,

    /// SQLite database file.
    pub db_path: PathBuf,
}

fn default_http_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_mirror_addr() -> String {
    "127.0.0.1:5001".to_string()
}

impl ServerConfig {
    /// Config with the default listener addresses and the store under the
    /// resolved data directory.
    pub fn with_defaults(explicit_data_dir: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(explicit_data_dir)?;
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self {
            http_addr: default_http_addr(),
            mirror_addr: default_mirror_addr(),
            db_path: data_dir.join("capreel.db"),
        })
    }

    pub fn load_from(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
