#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn cli(board: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shiftboard-cli").unwrap();
    cmd.env_remove("SHIFTBOARD_BOARD").arg("--board").arg(board);
    cmd
}

#[test]
fn create_sign_up_and_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let board = dir.path().join("board.json");

    let out = cli(&board)
        .args([
            "create-shift",
            "--name",
            "Tri",
            "--start",
            "2024-10-02T09:00:00Z",
            "--end",
            "2024-10-02T12:00:00Z",
            "--capacity",
            "1",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let id = String::from_utf8(out.stdout).unwrap().trim().to_string();
    assert!(!id.is_empty());

    cli(&board)
        .args(["sign-up", "--shift-id", &id, "--volunteer", "ana"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 full").and(predicate::str::contains("ana")));

    cli(&board)
        .args(["sign-up", "--shift-id", &id, "--volunteer", "bob"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("shift is full"));

    cli(&board)
        .args(["capacity", "--shift-id", &id, "--capacity", "-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("capacity must be >= 0"));

    cli(&board)
        .args(["delete", "--shift-id", &id])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("active signup"));

    cli(&board)
        .args(["delete", "--shift-id", &id, "--force"])
        .assert()
        .success()
        .stderr(predicate::str::contains("cancelled signups: ana"));

    cli(&board)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn plan_then_list_window() {
    let dir = tempfile::tempdir().unwrap();
    let board = dir.path().join("board.json");

    let out = cli(&board)
        .args([
            "plan",
            "--name",
            "Distribution",
            "--days",
            "Mo,We,Fr",
            "--from",
            "2024-10-01",
            "--to",
            "2024-10-07",
            "--start-time",
            "09:00",
            "--end-time",
            "12:00",
            "--capacity",
            "3",
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap().lines().count(), 3);

    cli(&board)
        .args(["list", "--from", "2024-10-04", "--to", "2024-10-04"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-10-04T09:00:00+00:00").and(predicate::str::contains("0/3 scheduled")));
}

#[test]
fn occurrences_and_week_preview() {
    let dir = tempfile::tempdir().unwrap();
    let board = dir.path().join("board.json");

    cli(&board)
        .args(["occurrences", "--days", "Mo,We,Fr", "--from", "2024-10-01", "--to", "2024-10-07"])
        .assert()
        .success()
        .stdout("2024-10-02 We\n2024-10-04 Fr\n2024-10-07 Mo\n");

    cli(&board)
        .args(["week", "--date", "2024-10-06"])
        .assert()
        .success()
        .stdout("2024-09-30..2024-10-06\n");

    cli(&board)
        .args(["occurrences", "--days", "Mo,Xx", "--from", "2024-10-01", "--to", "2024-10-07"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown day symbol"));
}
