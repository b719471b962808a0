//! CLI flag contract tests
//!
//! Exercises the binary for commands that need no network access:
//! help, version, init and argument validation.

use std::process::Command;

fn revsleuth_bin() -> String {
    env!("CARGO_BIN_EXE_revsleuth").to_string()
}

fn run(args: &[&str], dir: &std::path::Path) -> (i32, String, String) {
    let output = Command::new(revsleuth_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run revsleuth");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&["--help"], dir.path());
    assert_eq!(code, 0);
    for command in ["analyze", "edits", "search", "profile", "init", "version"] {
        assert!(stdout.contains(command), "help should list '{}'", command);
    }
}

#[test]
fn test_version_command() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&["version"], dir.path());
    assert_eq!(code, 0);
    assert_eq!(
        stdout.trim(),
        format!("revsleuth {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn test_init_creates_config_once() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(&["init"], dir.path());
    assert_eq!(code, 0);

    let written = std::fs::read_to_string(dir.path().join("revsleuth.toml")).unwrap();
    assert!(written.contains("[metrics]"));
    assert!(written.contains("marker = 2.0"));

    let (code, _, stderr) = run(&["init"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"));
}

#[test]
fn test_workers_out_of_range_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&["--workers", "0", "search", "x"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("at least 1"));

    let (code, _, stderr) = run(&["--workers", "65", "search", "x"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("cannot exceed 64"));
}

#[test]
fn test_unknown_format_rejected_before_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&["analyze", "Some page", "-f", "sarif"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown format"));
}

#[test]
fn test_analyze_without_pages_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&["analyze"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("No pages to analyse"));
}

#[test]
fn test_unknown_metric_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&["analyze", "Some page", "--metric", "vandal"], dir.path());
    assert_ne!(code, 0);
    assert!(stderr.contains("vandal"));
}

#[test]
fn test_bad_month_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(
        &["analyze", "P", "--start-month", "2021-13", "--end-month", "2022-01"],
        dir.path(),
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("2021-13"));
}
