use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

const API_KEY_VAR: &str = "INTEGRATION_SYNC_API_KEY";

fn create_minimal_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        "connection:\n  server_url: http://127.0.0.1:9\n  account_id: 7\nresources:\n  - address: bi\n    kind: hex\n    name: Hex\n    configuration:\n      api_token: hx-token\n      workspace_id: ws-1\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn kinds_lists_all_kinds_without_network() {
    let mut cmd = Command::cargo_bin("integration-sync").expect("Binary exists");
    cmd.arg("kinds")
        .env_remove(API_KEY_VAR)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("snowflake\tpull")
                .and(predicate::str::contains("fivetran\tpull"))
                .and(predicate::str::contains("hex\tpull"))
                .and(predicate::str::contains("dbt_core\tpush")),
        );
}

#[test]
fn lifecycle_command_requires_api_key() {
    let config = create_minimal_config();
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");

    let mut cmd = Command::cargo_bin("integration-sync").expect("Binary exists");
    cmd.arg("create")
        .arg("--config")
        .arg(config.path())
        .arg("--state")
        .arg(&state)
        .arg("--address")
        .arg("bi")
        .env_remove(API_KEY_VAR)
        .assert()
        .failure()
        .stderr(predicate::str::contains(API_KEY_VAR));
    assert!(!state.exists());
}

#[test]
fn import_rejects_non_numeric_id_before_any_call() {
    let config = create_minimal_config();
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");

    let mut cmd = Command::cargo_bin("integration-sync").expect("Binary exists");
    cmd.arg("import")
        .arg("--config")
        .arg(config.path())
        .arg("--state")
        .arg(&state)
        .arg("--address")
        .arg("bi")
        .arg("--id")
        .arg("abc")
        .env(API_KEY_VAR, "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be numeric"));
    assert!(!state.exists());
}

#[test]
fn unknown_address_fails() {
    let config = create_minimal_config();
    let dir = tempdir().unwrap();

    let mut cmd = Command::cargo_bin("integration-sync").expect("Binary exists");
    cmd.arg("create")
        .arg("--config")
        .arg(config.path())
        .arg("--state")
        .arg(dir.path().join("state.json"))
        .arg("--address")
        .arg("nope")
        .env(API_KEY_VAR, "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}
