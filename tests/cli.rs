use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;

const HEADER: &str = "indice,memoria(%),cpu(%),Disco-uso(%),Disk-Read(bytes),Disk-Write(bytes),Net-in(bytes),Net-out(bytes),TimeStamp";

fn txmonitor() -> Command {
    let mut cmd = Command::cargo_bin("txmonitor").unwrap();
    cmd.env_remove("RUST_LOG").timeout(Duration::from_secs(20));
    cmd
}

#[test]
fn no_arguments_prints_usage() {
    txmonitor()
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn zero_duration_is_rejected_before_opening_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");

    txmonitor()
        .arg("0")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1 second"));

    assert!(!out.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn negative_number_is_a_manual_file_name() {
    let dir = tempfile::tempdir().unwrap();

    txmonitor()
        .current_dir(dir.path())
        .args(["-q", "-5"])
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Monitoring (continuous)"));

    let content = fs::read_to_string(dir.path().join("-5")).unwrap();
    assert_eq!(content.lines().next(), Some(HEADER));
}

#[test]
fn zero_interval_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.csv");

    txmonitor()
        .args(["--interval", "0"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sampling interval"));

    assert!(!out.exists());
}

#[test]
fn unwritable_output_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("missing").join("out.csv");

    txmonitor()
        .arg(&out)
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open output file"));
}

#[cfg(target_os = "linux")]
#[test]
fn manual_run_stops_on_enter() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("manual.csv");

    txmonitor()
        .args(["--interval", "0.5"])
        .arg(&out)
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Press ENTER to stop"))
        .stdout(predicate::str::contains("Monitoring finished"));

    let content = fs::read_to_string(&out).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert!(lines.count() <= 1);
}

#[cfg(target_os = "linux")]
#[test]
fn timed_run_writes_rows() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("timed.csv");

    txmonitor()
        .args(["-q", "--interval", "0.2", "1"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Monitoring (timed, 1s)"))
        .stdout(predicate::str::contains(HEADER).not());

    let content = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], HEADER);

    let rows = &lines[1..];
    assert!((3..=8).contains(&rows.len()), "got {} rows", rows.len());
    for (i, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[0], (i + 1).to_string());
        let cpu: f64 = fields[2].parse().unwrap();
        assert!((0.0..=100.0).contains(&cpu));
    }
}
