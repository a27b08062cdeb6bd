use assert_cmd::Command;
use capreel_store::Database;
use capreel_testing::EventScript;
use capreel_types::SessionMetadata;
use chrono::Utc;
use predicates::prelude::*;

fn capreel() -> Command {
    Command::cargo_bin("capreel").expect("binary built")
}

fn seed_session(data_dir: &std::path::Path, session_id: &str, user: &str) {
    let db = Database::open(&data_dir.join("capreel.db")).unwrap();
    db.create_session(session_id, user, &SessionMetadata::new(), Utc::now())
        .unwrap();
    let events = EventScript::new(640, 480)
        .pointer_walk(10, 50, 12)
        .click_at(700, 100, 100)
        .scroll_at(800, 0, 64)
        .build();
    db.append_events(session_id, None, &events).unwrap();
    db.mark_ended(session_id).unwrap();
}

#[test]
fn help_lists_subcommands() {
    capreel()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("demo"));
}

#[test]
fn sessions_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    capreel()
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .args(["sessions", "--user", "nobody"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions recorded"));
}

#[test]
fn sessions_lists_seeded_recording() {
    let dir = tempfile::tempdir().unwrap();
    seed_session(dir.path(), "cli-session-1", "user-1");

    capreel()
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .args(["sessions", "--user", "user-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cli-session-1"))
        .stdout(predicate::str::contains("16"));
}

#[test]
fn sessions_json_output_parses() {
    let dir = tempfile::tempdir().unwrap();
    seed_session(dir.path(), "cli-session-1", "user-1");

    let output = capreel()
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .args(["sessions", "--user", "user-1", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed[0]["sessionId"], "cli-session-1");
    assert_eq!(parsed[0]["eventCount"], 16);
}

#[test]
fn show_prints_event_breakdown() {
    let dir = tempfile::tempdir().unwrap();
    seed_session(dir.path(), "cli-session-1", "user-1");

    capreel()
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .args(["show", "cli-session-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("events:   16"))
        .stdout(predicate::str::contains("fullSnapshot"))
        .stdout(predicate::str::contains("pointer"))
        .stdout(predicate::str::contains("scroll"));
}

#[test]
fn export_missing_session_fails() {
    let dir = tempfile::tempdir().unwrap();
    capreel()
        .args(["--data-dir", dir.path().to_str().unwrap()])
        .args(["export", "missing-session"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}
