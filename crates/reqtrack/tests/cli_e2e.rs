#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn reqtrack_cmd(data: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin("reqtrack"));
    cmd.env("REQTRACK_DATA", data.as_os_str())
        .env_remove("RUST_LOG");
    cmd
}

fn submit_fault(data: &Path, ip: &str, device: &str) -> String {
    let output = reqtrack_cmd(data)
        .args([
            "submit",
            "fault",
            "--ip",
            ip,
            "--name",
            "Grace Hopper",
            "--device",
            device,
            "--description",
            "Does not turn on",
            "--output",
            "json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    result["affected_tickets"][0]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_submit_and_list() {
    let temp = TempDir::new().unwrap();

    // 1. Submit
    reqtrack_cmd(temp.path())
        .args([
            "submit", "fault", "--ip", "10.0.0.5", "--name", "Grace Hopper", "--device",
            "Projector", "--description", "No signal",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fault request submitted: Projector"));

    // 2. Naked invocation lists
    reqtrack_cmd(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Projector (Grace Hopper)"))
        .stdout(predicate::str::contains("Pending Approval"));

    // 3. Data landed in the directory
    assert!(temp.path().join("tickets.json").exists());
    assert!(temp.path().join("tickets_backup.json").exists());
}

#[test]
fn test_invalid_submission_fails() {
    let temp = TempDir::new().unwrap();

    reqtrack_cmd(temp.path())
        .args([
            "submit", "material", "--ip", "10.0.0.5", "--name", "Grace Hopper",
            "--material-type", "Toner", "--description", "Black", "--quantity", "500",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Validation failed"))
        .stderr(predicate::str::contains("quantity"));

    reqtrack_cmd(temp.path())
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tickets found."));
}

#[test]
fn test_status_workflow_records_actor() {
    let temp = TempDir::new().unwrap();
    let id = submit_fault(temp.path(), "10.0.0.5", "Printer");

    reqtrack_cmd(temp.path())
        .args(["status", &id, "approved", "--actor", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now Approved"));

    reqtrack_cmd(temp.path())
        .args(["status", &id, "completed", "--note", "Drum replaced", "--actor", "admin"])
        .assert()
        .success();

    reqtrack_cmd(temp.path())
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Drum replaced (admin)"))
        .stdout(predicate::str::contains("Modified:"));

    reqtrack_cmd(temp.path())
        .args(["stats", "--ip", "10.0.0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("completed   1"));
}

#[test]
fn test_delete_moves_to_deleted_table() {
    let temp = TempDir::new().unwrap();
    let id = submit_fault(temp.path(), "10.0.0.5", "Scanner");

    reqtrack_cmd(temp.path())
        .args(["delete", &id, "--actor", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    reqtrack_cmd(temp.path())
        .args(["deleted", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deletedBy\": \"admin\""))
        .stdout(predicate::str::contains("\"deletedFrom\": \"cli\""));

    reqtrack_cmd(temp.path())
        .args(["show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_export_tsv_to_file() {
    let temp = TempDir::new().unwrap();
    submit_fault(temp.path(), "10.0.0.5", "Projector");
    submit_fault(temp.path(), "10.0.0.6", "Monitor");
    let out = temp.path().join("export.tsv");

    reqtrack_cmd(temp.path())
        .args(["export", "--out", out.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 2 ticket(s)"));

    let text = std::fs::read_to_string(&out).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("IP\tName\tRequest Type"));
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_rate_limit_across_invocations() {
    let temp = TempDir::new().unwrap();
    for device in ["A", "B", "C"] {
        submit_fault(temp.path(), "10.0.0.9", device);
    }

    reqtrack_cmd(temp.path())
        .args([
            "submit", "fault", "--ip", "10.0.0.9", "--name", "Grace Hopper", "--device", "D",
            "--description", "Again",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Too many attempts"));
}

#[test]
fn test_backup_doctor_and_watch() {
    let temp = TempDir::new().unwrap();
    submit_fault(temp.path(), "10.0.0.5", "Router");

    reqtrack_cmd(temp.path())
        .args(["backup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Backed up 1 ticket(s)"));

    reqtrack_cmd(temp.path())
        .args(["doctor"])
        .assert()
        .success();

    reqtrack_cmd(temp.path())
        .args(["watch", "--iterations", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching"));

    reqtrack_cmd(temp.path())
        .args(["stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dated backups  1"));
}
