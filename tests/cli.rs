use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn non_positive_max_backups_exits_with_usage_error() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .arg("0")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn non_numeric_max_backups_exits_with_usage_error() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .arg("not-a-number")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn dash_leading_max_backups_exits_with_usage_error() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .arg("-5")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn single_positional_argument_is_rejected() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("usage"));
}

#[test]
fn empty_job_directory_exits_with_failure() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .arg("1")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn batch_mode_processes_job_files_and_writes_output() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("demo.job"),
        "WRITE [(k,1)]\nREAD [k]\n",
    )
    .unwrap();

    Command::cargo_bin("kvs-jobs")
        .unwrap()
        .arg(temp.path())
        .arg("1")
        .assert()
        .success();

    let out = std::fs::read_to_string(temp.path().join("demo.out")).unwrap();
    assert_eq!(out, "[(k,1)]\n");
}
