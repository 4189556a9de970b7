//! Integration tests for the `mxfw` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! and the fatal configuration errors, without a live Dashboard.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `mxfw` binary with env isolation.
///
/// Clears the API key and `MXFW_*` variables and points config
/// directories at a nonexistent path so tests never touch the user's real
/// configuration.
fn mxfw_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("mxfw");
    cmd.env("HOME", "/tmp/mxfw-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/mxfw-cli-test-nonexistent")
        .env_remove("MERAKI_DASHBOARD_API_KEY")
        .env_remove("MXFW_API_KEY")
        .env_remove("MXFW_API_KEY_ENV")
        .env_remove("MXFW_BASE_URL")
        .env_remove("MXFW_OUTPUT")
        .env_remove("MXFW_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn rule_sheet(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write!(
        file,
        "Device,Rule#,Comment,Policy,Protocol,Src Type,Src Value,Dst Type,Dst Value,Src Port,Dst Port\n{body}"
    )
    .unwrap();
    file
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = mxfw_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    mxfw_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("firewall rules")
            .and(predicate::str::contains("deploy"))
            .and(predicate::str::contains("config"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_deploy_help_lists_flags() {
    mxfw_cmd().args(["deploy", "--help"]).assert().success().stdout(
        predicate::str::contains("--rules")
            .and(predicate::str::contains("--dry-run"))
            .and(predicate::str::contains("--max-workers"))
            .and(predicate::str::contains("--backup-dir")),
    );
}

#[test]
fn test_version_flag() {
    mxfw_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mxfw"));
}

#[test]
fn test_invalid_subcommand() {
    mxfw_cmd()
        .arg("explode")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    mxfw_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    mxfw_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mxfw"));
}

#[test]
fn test_completions_fish() {
    mxfw_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_prints_location() {
    mxfw_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

// ── Deploy: fatal errors ────────────────────────────────────────────

#[test]
fn test_deploy_requires_rules_flag() {
    mxfw_cmd()
        .args(["deploy", "--dry-run"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--rules"));
}

#[test]
fn test_deploy_zero_workers_rejected() {
    mxfw_cmd()
        .args(["deploy", "--rules", "rules.csv", "--max-workers", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_deploy_without_api_key() {
    let sheet = rule_sheet("SW-HQ-01,1,Web,allow,tcp,any,,any,,,443\n");
    let output = mxfw_cmd()
        .args(["deploy", "--dry-run", "--rules"])
        .arg(sheet.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code 3");
    let text = combined_output(&output);
    assert!(text.contains("API key"), "Expected credential hint:\n{text}");
}

#[test]
fn test_deploy_missing_rule_sheet() {
    let output = mxfw_cmd()
        .args([
            "--api-key",
            "test-key",
            "deploy",
            "--dry-run",
            "--rules",
            "/tmp/mxfw-cli-test-nonexistent/rules.csv",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Rule sheet"), "Expected sheet error:\n{text}");
}

#[test]
fn test_deploy_sheet_error_names_line() {
    let sheet = rule_sheet("SW-HQ-01,1,Web,allow,tcp,any,,any,,,443\nSW-HQ-01,2,Bad,block,tcp,any,,any,,,80\n");
    let output = mxfw_cmd()
        .args(["--api-key", "test-key", "deploy", "--dry-run", "--rules"])
        .arg(sheet.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("line 3"), "Expected line number:\n{text}");
}

#[test]
fn test_deploy_empty_rule_sheet() {
    let sheet = rule_sheet("");
    mxfw_cmd()
        .args(["--api-key", "test-key", "deploy", "--dry-run", "--rules"])
        .arg(sheet.path())
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("no rules"));
}

#[test]
fn test_live_deploy_without_terminal_requires_yes() {
    let sheet = rule_sheet("SW-HQ-01,1,Web,allow,tcp,any,,any,,,443\n");
    mxfw_cmd()
        .args(["--api-key", "test-key", "deploy", "--rules"])
        .arg(sheet.path())
        .write_stdin("")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_unreachable_dashboard_is_a_connection_error() {
    let sheet = rule_sheet("SW-HQ-01,1,Web,allow,tcp,any,,any,,,443\n");
    mxfw_cmd()
        .env("MXFW_RETRY__MAX_ATTEMPTS", "1")
        .args([
            "--api-key",
            "test-key",
            "--base-url",
            "http://127.0.0.1:9/api/v1",
            "--timeout",
            "2",
            "deploy",
            "--dry-run",
            "--rules",
        ])
        .arg(sheet.path())
        .assert()
        .failure()
        .code(7);
}
