use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("pulse")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("events"))
        .stdout(predicate::str::contains("calendar"))
        .stdout(predicate::str::contains("notifications"));
}

#[test]
fn test_events_help_shows_subcommands() {
    cargo_bin_cmd!("pulse")
        .args(["events", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("archive"))
        .stdout(predicate::str::contains("participate"));
}

#[test]
fn test_unknown_filter_value_is_rejected() {
    cargo_bin_cmd!("pulse")
        .args(["events", "list", "--type", "chess"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown EventType"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("pulse")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
