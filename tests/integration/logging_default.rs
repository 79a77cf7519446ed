//! Integration tests for log routing of the CLI binary.
//!
//! Stdout carries the rendered script, so log events must go to stderr by
//! default, or to the log file when file output is selected.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run(temp_dir: &Path, args: &[&str]) -> Output {
    let config_home = temp_dir.join("config");
    let home = temp_dir.join("home");
    let submit_dir = temp_dir.join("submit");
    fs::create_dir_all(&config_home).unwrap();
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&submit_dir).unwrap();

    let bin = env!("CARGO_BIN_EXE_sendscript");
    Command::new(bin)
        .env("XDG_CONFIG_HOME", config_home.as_os_str())
        .env("HOME", home.as_os_str())
        .env("USER", "tester")
        .env_remove("SENDSCRIPT_LOG")
        .env_remove("SENDSCRIPT_LOG_OUTPUT")
        .env_remove("SENDSCRIPT_LOG_FORMAT")
        .arg("--submit-dir")
        .arg(&submit_dir)
        .arg("--qsys")
        .arg("pbs")
        .args(args)
        .output()
        .unwrap()
}

const BUILD: [&str; 5] = ["build", "--name", "logged", "--command", "true"];

#[test]
fn test_warnings_go_to_stderr_not_script() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(temp_dir.path(), &BUILD);

    assert!(
        output.status.success(),
        "build should succeed: stderr={:?}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.starts_with("#!/bin/bash\n"));
    assert!(!stdout.contains("Walltime not set"));
    assert!(stderr.contains("Walltime not set"), "stderr={}", stderr);
}

#[test]
fn test_quiet_suppresses_logs() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = vec!["--quiet"];
    args.extend_from_slice(&BUILD);
    let output = run(temp_dir.path(), &args);

    assert!(output.status.success());
    assert!(output.stderr.is_empty(), "stderr={:?}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn test_file_output_writes_default_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut args = vec!["--log-output", "file", "--log-format", "json"];
    args.extend_from_slice(&BUILD);
    let output = run(temp_dir.path(), &args);

    assert!(output.status.success());
    let log_path = temp_dir.path().join("submit").join("sendscript.log");
    let contents = fs::read_to_string(&log_path).unwrap();
    let first: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
    assert_eq!(first["level"], "WARN");
}

#[test]
fn test_errors_exit_nonzero_with_one_line() {
    let temp_dir = TempDir::new().unwrap();
    let output = run(temp_dir.path(), &["--quiet", "build", "--name", "x"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.lines().count(), 1, "stderr={}", stderr);
    assert!(stderr.contains("--command"));
}
