use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Parser)]
#[command(name = "capreel")]
#[command(about = "Record, store, replay, and export interaction sessions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Data directory holding the session database (defaults to the
    /// platform data dir, or $CAPREEL_PATH)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the session store server (REST API + live mirror channel)
    Serve {
        /// REST listener address (overrides the config file)
        #[arg(long)]
        addr: Option<String>,

        /// Live-mirror listener address (overrides the config file)
        #[arg(long)]
        mirror_addr: Option<String>,
    },

    /// List a user's recorded sessions
    Sessions {
        #[arg(long)]
        user: String,

        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show one session's detail and event breakdown
    Show {
        session_id: String,
    },

    /// Re-encode a stored recording into a video file
    Export {
        session_id: String,

        #[arg(long, short, default_value = "recording.mp4")]
        out: PathBuf,

        #[arg(long, default_value = "30")]
        fps: u32,

        #[arg(long, default_value = "1280")]
        width: u32,

        #[arg(long, default_value = "720")]
        height: u32,

        /// Settle budget granted to the renderer after each seek, in ms
        #[arg(long, default_value = "150")]
        settle_ms: u64,
    },

    /// Record a synthetic session against a running server (exercises the
    /// full capture stack)
    Demo {
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,

        #[arg(long, default_value = "127.0.0.1:5001")]
        mirror_addr: String,

        #[arg(long, default_value = "demo-user")]
        user: String,

        #[arg(long, default_value = "120")]
        events: usize,
    },
}
