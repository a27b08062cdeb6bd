use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;

use capreel_store::Database;

use super::resolve_db_path;

pub fn handle(data_dir: Option<&str>, session_id: &str) -> Result<()> {
    let db_path = resolve_db_path(data_dir)?;
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;

    let Some(session) = db.get_session(session_id)? else {
        bail!("Session not found: {}", session_id);
    };

    println!("{} {}", "Session".bold(), session.session_id);
    println!("  user:     {}", session.user_id);
    println!(
        "  started:  {}",
        session.start_time.format("%Y-%m-%d %H:%M:%S%.3f")
    );
    match session.end_time {
        Some(end) => println!("  ended:    {}", end.format("%Y-%m-%d %H:%M:%S%.3f")),
        None => println!("  ended:    {}", "(still recording)".yellow()),
    }
    println!("  duration: {} ms", session.duration_ms());
    println!("  events:   {}", session.events.len());

    if !session.metadata.is_empty() {
        println!("  metadata:");
        for (key, value) in &session.metadata {
            println!("    {}: {}", key, value);
        }
    }

    let mut kinds: BTreeMap<&str, usize> = BTreeMap::new();
    for event in &session.events {
        *kinds.entry(event.kind()).or_default() += 1;
    }
    if !kinds.is_empty() {
        println!("  breakdown:");
        for (kind, count) in kinds {
            println!("    {:<14} {}", kind, count);
        }
    }

    Ok(())
}
