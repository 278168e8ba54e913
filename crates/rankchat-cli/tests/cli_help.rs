use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("rankchat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("speak"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_sessions_help_shows_subcommands() {
    cargo_bin_cmd!("rankchat")
        .args(["sessions", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("stats"));
}

#[test]
fn test_ask_help_shows_output_flags() {
    cargo_bin_cmd!("rankchat")
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--raw"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--attach"))
        .stdout(predicate::str::contains("--show-reasoning"));
}

#[test]
fn test_speak_help_shows_out_flag() {
    cargo_bin_cmd!("rankchat")
        .args(["speak", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--out"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("rankchat")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
