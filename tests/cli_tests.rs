//! End-to-end CLI tests driving the `updraft` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn updraft(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("updraft").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env("ADMIN_USER", "opsadmin")
        .env("ADMIN_SSH_PUBKEY", "ssh-ed25519 AAAA test")
        .env("ACCESS_SOURCE_ADDRESS_PREFIX", "203.0.113.0/24")
        .env("AZURE_LOCATION", "westeurope");
    cmd
}

#[test]
fn test_help_lists_modes() {
    Command::cargo_bin("updraft")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("--env-file"));
}

#[test]
fn test_missing_config_fails_with_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("updraft").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("ADMIN_USER")
        .env_remove("ADMIN_SSH_PUBKEY")
        .env_remove("ACCESS_SOURCE_ADDRESS_PREFIX")
        .env_remove("AZURE_LOCATION");

    cmd.assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Missing required configuration"));
}

#[test]
fn test_apply_prints_summary_and_persists_state() {
    let dir = tempfile::tempdir().unwrap();

    updraft(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("successfully initialized stack"))
        .stdout(predicate::str::contains("creating"))
        .stdout(predicate::str::contains("update summary:"))
        .stdout(predicate::str::contains("\"create\": 15"))
        .stdout(predicate::str::contains("automation_account"));

    let state_path = dir.path().join(".updraft/update-management/dev.json");
    assert!(state_path.exists());

    let state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
    assert_eq!(state["resources"].as_array().unwrap().len(), 15);
    assert!(state["outputs"]["vm_output"].is_array());
}

#[test]
fn test_preview_reports_plan_without_persisting() {
    let dir = tempfile::tempdir().unwrap();

    updraft(&dir)
        .arg("preview")
        .assert()
        .success()
        .stdout(predicate::str::contains("stack preview"))
        .stdout(predicate::str::contains("would create"))
        .stdout(predicate::str::contains("preview summary:"));

    assert!(!dir
        .path()
        .join(".updraft/update-management/dev.json")
        .exists());
}

#[test]
fn test_apply_then_preview_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();

    updraft(&dir).assert().success();

    updraft(&dir)
        .arg("preview")
        .assert()
        .success()
        .stdout(predicate::str::contains("unchanged"))
        .stdout(predicate::str::contains("\"same\": 15"));
}

#[test]
fn test_destroy_clears_stack() {
    let dir = tempfile::tempdir().unwrap();

    updraft(&dir).assert().success();

    updraft(&dir)
        .arg("destroy")
        .assert()
        .success()
        .stdout(predicate::str::contains("destroying stack..."))
        .stdout(predicate::str::contains("deleting"))
        .stdout(predicate::str::contains("stack destroy complete"));

    let state: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(".updraft/update-management/dev.json")).unwrap(),
    )
    .unwrap();
    assert!(state["resources"].as_array().unwrap().is_empty());
    assert!(state["outputs"].as_object().unwrap().is_empty());
}

#[test]
fn test_env_file_supplies_configuration() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("dev.env"),
        "ADMIN_USER=fileadmin\n\
         ADMIN_SSH_PUBKEY=ssh-ed25519 AAAA file\n\
         ACCESS_SOURCE_ADDRESS_PREFIX=198.51.100.0/24\n\
         AZURE_LOCATION=northeurope\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("updraft").unwrap();
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("ADMIN_USER")
        .env_remove("ADMIN_SSH_PUBKEY")
        .env_remove("ACCESS_SOURCE_ADDRESS_PREFIX")
        .env_remove("AZURE_LOCATION");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("update summary:"));
}
