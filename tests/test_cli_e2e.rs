//! End-to-end runs of the `sortie` binary.

mod common;

use common::{fixture_path, sortie};
use sortie::error::ExitCode;

fn fixture(name: &str) -> String {
    fixture_path(name).to_string_lossy().into_owned()
}

#[test]
fn version_prints_name() {
    let output = sortie(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("sortie "), "{stdout}");
}

#[test]
fn version_json() {
    let output = sortie(&["version", "--format", "json"]);
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["name"], "sortie");
}

#[test]
fn validate_valid_fixture() {
    let output = sortie(&["validate", &fixture("first_contact.yaml")]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains(": ok"));
}

#[test]
fn validate_invalid_fixture_fails_with_config_code() {
    let output = sortie(&["validate", &fixture("invalid.yaml")]);
    assert_eq!(output.status.code(), Some(ExitCode::CONFIG_ERROR));
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAILED"));
}

#[test]
fn validate_strict_promotes_warnings() {
    let file = fixture("no_actions.yaml");
    assert!(sortie(&["validate", &file]).status.success());

    let output = sortie(&["validate", "--strict", &file]);
    assert_eq!(output.status.code(), Some(ExitCode::CONFIG_ERROR));
}

#[test]
fn validate_json_report() {
    let output = sortie(&[
        "validate",
        "--format",
        "json",
        &fixture("first_contact.yaml"),
        &fixture("invalid.yaml"),
    ]);
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["valid"], true);
    assert_eq!(reports[1]["valid"], false);
    assert_eq!(reports[1]["errors"][0]["severity"], "error");
}

#[test]
fn run_completes_with_scheduled_deaths() {
    let output = sortie(&[
        "run",
        &fixture("first_contact.yaml"),
        "--inform",
        "enemy_died@6s",
        "--inform",
        "enemy_died@7s",
        "--format",
        "json",
    ]);
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["stop_reason"], "completed");
    assert_eq!(summary["final_scene"], "main_menu");
    let elapsed = summary["elapsed_secs"].as_f64().unwrap();
    assert!((7.0..7.1).contains(&elapsed), "{elapsed}");
}

#[test]
fn run_without_deaths_hits_time_limit() {
    let output = sortie(&["run", &fixture("first_contact.yaml"), "--for", "20s"]);
    assert_eq!(output.status.code(), Some(ExitCode::INCOMPLETE));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("time limit reached"), "{stdout}");
}

#[test]
fn run_player_death_halts() {
    let output = sortie(&[
        "run",
        &fixture("first_contact.yaml"),
        "--countdown",
        "0",
        "--inform",
        "player_died@1s",
    ]);
    assert_eq!(output.status.code(), Some(ExitCode::INCOMPLETE));
    assert!(String::from_utf8_lossy(&output.stdout).contains("halted"));
}

#[test]
fn run_rejects_malformed_inform() {
    let output = sortie(&["run", &fixture("first_contact.yaml"), "--inform", "enemy_died"]);
    assert_eq!(output.status.code(), Some(ExitCode::USAGE_ERROR));
}

#[test]
fn run_missing_level() {
    let output = sortie(&["run", "/nonexistent/sortie/level.yaml"]);
    assert_eq!(output.status.code(), Some(ExitCode::CONFIG_ERROR));
}
