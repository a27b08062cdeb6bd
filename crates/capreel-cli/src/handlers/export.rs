use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;

use capreel_engine::{export_video, BasicRenderer, ExportConfig, FfmpegEncoder, ReplayDriver};
use capreel_store::Database;

use super::resolve_db_path;

pub struct ExportArgs {
    pub out: PathBuf,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub settle_ms: u64,
}

pub fn handle(data_dir: Option<&str>, session_id: &str, args: ExportArgs) -> Result<()> {
    let db_path = resolve_db_path(data_dir)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    let Some(session) = db.get_session(session_id)? else {
        bail!("Session not found: {}", session_id);
    };

    println!(
        "Exporting session {} ({} events, {} ms) at {} fps",
        session_id,
        session.events.len(),
        session.duration_ms(),
        args.fps
    );

    let mut driver = ReplayDriver::new(BasicRenderer::new(args.width, args.height));
    driver.load(session.events)?;

    let encoder = FfmpegEncoder::new(args.out.clone(), args.fps)?;
    let config = ExportConfig {
        fps: args.fps,
        settle_budget: Duration::from_millis(args.settle_ms),
    };

    let mut last_decile = 0;
    let artifact = export_video(&mut driver, encoder, &config, |progress| {
        let decile = (progress.ratio() * 10.0) as u32;
        if decile > last_decile {
            last_decile = decile;
            println!("  {:>3}%", decile * 10);
        }
    })?;

    println!(
        "{} {} ({} frames at {} fps)",
        "Exported".green(),
        artifact.path.display(),
        artifact.frame_count,
        artifact.fps
    );

    Ok(())
}
