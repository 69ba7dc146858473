//! CLI binary integration tests.
//!
//! These tests exercise the compiled `reportcast` binary to verify that
//! top-level command routing, help text, and error handling work as expected.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Locate the compiled `reportcast` binary in the workspace target directory.
fn reportcast_bin() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    // tests/integration -> workspace root
    let workspace_root = manifest_dir
        .parent()
        .expect("tests/ parent")
        .parent()
        .expect("workspace root");
    let bin = workspace_root.join("target").join("debug").join("reportcast");
    assert!(
        bin.exists(),
        "reportcast binary not found at {}; run `cargo build -p reportcast-cli` first",
        bin.display()
    );
    bin
}

/// A command isolated from the user's real config and ledger.
fn reportcast_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(reportcast_bin());
    cmd.env("REPORTCAST_HOME", home.path())
        .env_remove("REPORTCAST_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = reportcast_cmd(&home)
        .arg("version")
        .output()
        .expect("failed to run reportcast");
    assert!(output.status.success(), "version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("reportcast"),
        "version output should contain 'reportcast', got: {}",
        stdout
    );
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = reportcast_cmd(&home)
        .arg("--help")
        .output()
        .expect("failed to run reportcast");
    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["report", "send", "status", "ledger", "classify"] {
        assert!(
            stdout.contains(command),
            "help output should mention '{}', got: {}",
            command,
            stdout
        );
    }
}

#[test]
fn test_cli_unknown_command() {
    let home = TempDir::new().unwrap();
    let output = reportcast_cmd(&home)
        .arg("definitely-not-a-command")
        .output()
        .expect("failed to run reportcast");
    assert!(!output.status.success(), "unknown command should fail");
}

#[test]
fn test_cli_classify_json() {
    let home = TempDir::new().unwrap();
    let output = reportcast_cmd(&home)
        .args(["classify", "--json", "request", "timed", "out"])
        .output()
        .expect("failed to run reportcast");
    assert!(output.status.success(), "classify should succeed");

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["code"], "timeout");
    assert_eq!(value["kind"], "temporary");
    assert_eq!(value["retryable"], true);
}

#[test]
fn test_cli_send_unknown_report_fails() {
    let home = TempDir::new().unwrap();
    let output = reportcast_cmd(&home)
        .args(["send", "rpt_missing", "--channel", "sms", "--to", "01012345678"])
        .output()
        .expect("failed to run reportcast");
    assert!(!output.status.success(), "send with no report should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Report not found"),
        "error should name the missing report, got: {}",
        stderr
    );
}

#[test]
fn test_cli_config_init_then_validate() {
    let home = TempDir::new().unwrap();
    let init = reportcast_cmd(&home)
        .args(["config", "init"])
        .output()
        .expect("failed to run reportcast");
    assert!(init.status.success(), "config init should succeed");
    assert!(home.path().join("reportcast.json5").exists());

    let validate = reportcast_cmd(&home)
        .args(["config", "validate"])
        .output()
        .expect("failed to run reportcast");
    assert!(validate.status.success(), "fresh config should validate");
}
