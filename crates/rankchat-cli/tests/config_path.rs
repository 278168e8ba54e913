use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("model ="));
    assert!(contents.contains("[providers.gemini]"));
    assert!(contents.contains("[tts]"));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("rankchat")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_sessions_list_empty() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions found."));
}

#[test]
fn test_stats_empty() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["sessions", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No usage recorded yet."));
}

#[test]
fn test_unknown_response_mode_rejected() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("rankchat")
        .env("RANKCHAT_HOME", dir.path())
        .args(["--mode", "verbose", "sessions", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown response mode"));
}
