use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

#[allow(deprecated)]
fn get_shelfpics_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("shelfpics")
}

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("gui"))
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_run_help() {
    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.args(["run", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("SPREADSHEET"))
        .stdout(predicate::str::contains("--chrome-path"))
        .stdout(predicate::str::contains("--profile"))
        .stdout(predicate::str::contains("--temp"))
        .stdout(predicate::str::contains("--headless"));
}

#[test]
fn test_run_requires_spreadsheet() {
    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.arg("run");

    cmd.assert().failure();
}

#[test]
fn test_run_profile_conflicts_with_temp() {
    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.args(["run", "catalog.xlsx", "--profile", "work", "--temp"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_run_without_config_fails() {
    let temp = tempfile::tempdir().unwrap();

    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.current_dir(temp.path())
        .env_remove("SHELFPICS_CONFIG")
        .args(["run", "catalog.xlsx", "--temp"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_run_with_missing_spreadsheet_fails() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(
        temp.path().join("config.ini"),
        "[Settings]\nLOGIN = a@b.c\nPASSWORD = x\nBASE_DIR = work\n",
    )
    .unwrap();

    let mut cmd = Command::new(get_shelfpics_bin());
    cmd.current_dir(temp.path())
        .env_remove("SHELFPICS_CONFIG")
        .args(["run", "missing.xlsx", "--temp"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Spreadsheet not found"));
}
