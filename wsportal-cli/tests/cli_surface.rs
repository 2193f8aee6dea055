//! CLI argument and configuration surface. Every test here exits before
//! the first remote call.

use assert_cmd::Command;
use predicates::prelude::*;

fn wsportal() -> Command {
    Command::cargo_bin("wsportal").expect("binary built")
}

#[test]
fn help_lists_every_subcommand() {
    wsportal()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("reap"))
        .stdout(predicate::str::contains("action"))
        .stdout(predicate::str::contains("daemon"));
}

#[test]
fn action_rejects_unknown_actions_before_any_network_call() {
    wsportal()
        .args(["action", "ws-1", "--action", "Frobnicate", "--user", "jsmith"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action"))
        .stderr(predicate::str::contains("Decommission"));
}

#[test]
fn action_requires_a_user() {
    wsportal()
        .args(["action", "ws-1", "--action", "Stop"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn import_rejects_malformed_interval_config() {
    wsportal()
        .env("SyncIntervalSeconds", "soon")
        .arg("import")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SyncIntervalSeconds"));
}

#[test]
fn unknown_subcommands_fail() {
    wsportal()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn daemon_status_reports_not_running_without_a_daemon() {
    let home = tempfile::TempDir::new().expect("home");
    wsportal()
        .env("HOME", home.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"running\": false"));
}
