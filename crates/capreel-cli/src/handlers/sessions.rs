use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use capreel_store::Database;

use super::resolve_db_path;
use crate::args::OutputFormat;

pub fn handle(data_dir: Option<&str>, user: &str, format: OutputFormat) -> Result<()> {
    let db_path = resolve_db_path(data_dir)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    let summaries = db.list_by_user(user)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        OutputFormat::Plain => {
            if summaries.is_empty() {
                println!("No sessions recorded for user '{}'", user);
                return Ok(());
            }

            println!(
                "{:<38} {:<22} {:<22} {:>8}",
                "SESSION".bold(),
                "STARTED".bold(),
                "ENDED".bold(),
                "EVENTS".bold()
            );
            for summary in &summaries {
                let ended = summary
                    .end_time
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "(recording)".to_string());
                println!(
                    "{:<38} {:<22} {:<22} {:>8}",
                    summary.session_id,
                    summary.start_time.format("%Y-%m-%d %H:%M:%S"),
                    ended,
                    summary.event_count
                );
            }
        }
    }

    Ok(())
}
