//! Integration tests for basic CLI behavior.
//!
//! Every test that loads config points `--config` at a missing file so the
//! defaults apply regardless of the host machine.

#![allow(deprecated)] // cargo_bin deprecation; replacement not yet stable

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: get a Command for the `commentpulse` binary.
fn commentpulse() -> Command {
    let mut cmd = Command::cargo_bin("commentpulse").expect("binary 'commentpulse' should be built");
    cmd.args(["--config", "/nonexistent/commentpulse/config.toml"]);
    cmd
}

// ─── Top-level flags ─────────────────────────────────────────────────────────

#[test]
fn help_flag_shows_usage() {
    commentpulse()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: commentpulse"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("score"));
}

#[test]
fn version_flag_shows_semver() {
    Command::cargo_bin("commentpulse")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^commentpulse \d+\.\d+\.\d+\n$").unwrap());
}

#[test]
fn no_subcommand_shows_error_and_usage() {
    commentpulse()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: commentpulse"));
}

#[test]
fn invalid_subcommand_fails() {
    commentpulse()
        .arg("this-is-not-a-real-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ─── Subcommand help ─────────────────────────────────────────────────────────

#[test]
fn analyze_help() {
    commentpulse()
        .args(["analyze", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--offline"));
}

#[test]
fn monitor_help() {
    commentpulse()
        .args(["monitor", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

// ─── score ───────────────────────────────────────────────────────────────────

#[test]
fn score_prints_negative_result_as_json() {
    commentpulse()
        .args(["score", "--lexical", "This is terrible and awful, total garbage"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""label": "negative""#))
        .stdout(predicate::str::contains(r#""emotion": "neutral""#));
}

#[test]
fn score_empty_text_is_neutral() {
    commentpulse()
        .args(["score", ""])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""label": "neutral""#))
        .stdout(predicate::str::contains(r#""score": 0.0"#));
}

// ─── analyze ─────────────────────────────────────────────────────────────────

#[test]
fn analyze_offline_json_report() {
    commentpulse()
        .args(["analyze", "--offline", "--json", "https://www.youtube.com/watch?v=O6DTtVOPwEU"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""item_id": "O6DTtVOPwEU""#))
        .stdout(predicate::str::contains(r#""total_comments": 100"#))
        .stdout(predicate::str::contains("recent_comments"));
}

#[test]
fn analyze_offline_summary() {
    commentpulse()
        .args(["analyze", "--offline", "https://youtu.be/O6DTtVOPwEU"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Political Analysis & Current Events"))
        .stdout(predicate::str::contains("Positive:"));
}

#[test]
fn analyze_rejects_url_without_id() {
    commentpulse()
        .args(["analyze", "--offline", "https://example.com/no-id-here"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid reference"));
}
