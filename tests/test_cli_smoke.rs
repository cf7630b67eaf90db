//! Smoke tests for the charter binary.
//!
//! Only paths that never reach a provider are exercised: argument parsing,
//! configuration reporting, input validation and the discover command.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// The binary, isolated from any user or repository configuration.
fn charter_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("charter"));
    cmd.current_dir(home.path())
        .env("CHARTER_HOME", home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("ANTHROPIC_API_KEY", "test-key-not-used")
        .env_remove("RUST_LOG")
        .stdin(Stdio::null());
    cmd
}

#[test]
fn version_output() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("charter"));
}

#[test]
fn help_lists_every_subcommand() {
    let home = TempDir::new().unwrap();
    let expected = ["run", "discover", "health", "config"]
        .into_iter()
        .fold(predicate::str::contains("Commands:").boxed(), |acc, command| {
            acc.and(predicate::str::contains(command)).boxed()
        });
    charter_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .arg("publish")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("publish"));
}

#[test]
fn config_reports_defaults() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"generation\.preference\s+= local").unwrap())
        .stdout(predicate::str::contains("privacy.strictness"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn config_attributes_file_values() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        "[generation]\nconcurrency_limit = 2\n\n[privacy]\nstrictness = \"permissive\"\n",
    )
    .unwrap();

    charter_cmd(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"generation\.concurrency_limit\s+= 2\s+\(config\)").unwrap(),
        )
        .stdout(predicate::str::is_match(r"privacy\.strictness\s+= permissive\s+\(config\)").unwrap());
}

#[test]
fn unknown_config_key_is_rejected() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    std::fs::write(&path, "[generation]\nconcurency_limit = 2\n").unwrap();

    charter_cmd(&home)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .code(2);
}

#[test]
fn run_rejects_a_short_description() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .args(["run", "--name", "Clinic", "--description", "too short", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("description"));
}

#[test]
fn run_without_remote_key_is_a_configuration_error() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .env_remove("ANTHROPIC_API_KEY")
        .args([
            "run",
            "--name",
            "Clinic Intake",
            "--description",
            "A patient intake web app for a rural health clinic",
            "--yes",
        ])
        .assert()
        .code(2);
}

#[test]
fn discover_prints_agents_and_findings_as_json() {
    let home = TempDir::new().unwrap();
    charter_cmd(&home)
        .args([
            "discover",
            "--name",
            "Clinic Intake",
            "--description",
            "A patient intake web app for a rural health clinic. Call Jane Doe at 555-123-4567.",
            "--json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"agents\""))
        .stdout(predicate::str::contains("\"privacy_findings\""))
        .stdout(predicate::str::contains("\"blocking\""));
}
