//! CLI tests for the `qm` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SNAPSHOT: &str = r#"{
  "gold": 1500,
  "items0": [
    {"name": "helmet", "level": 5},
    {"name": "helmet", "level": 4},
    {"name": "helmet", "level": 3},
    {"name": "hpot0", "q": 20},
    null
  ]
}"#;

/// A `qm` command isolated from the user's config, logs and terminal
fn qm(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("qm").expect("qm binary");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_snapshot(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("bank.json");
    fs::write(&path, SNAPSHOT).expect("write snapshot");
    path
}

// =============================================================================
// Inspect Tests
// =============================================================================

#[test]
fn test_inspect_text() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);

    qm(dir.path())
        .arg("inspect")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("1500"))
        .stdout(predicate::str::contains("items0"))
        .stdout(predicate::str::contains("4/42"))
        .stdout(predicate::str::contains("hpot0"));
}

#[test]
fn test_inspect_json() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);

    let output = qm(dir.path())
        .args(["inspect", "--format", "json"])
        .arg(&snapshot)
        .output()
        .expect("run qm");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    assert_eq!(report["gold"], 1500);
    assert_eq!(report["items"]["hpot0"], 20);
    assert_eq!(report["items"]["helmet"], 3);
    assert_eq!(report["containers"]["items0"]["used"], 4);
    assert_eq!(report["containers"]["items0"]["capacity"], 42);
}

#[test]
fn test_inspect_missing_snapshot_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    qm(dir.path())
        .args(["inspect", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read snapshot"));
}

// =============================================================================
// Plan Tests
// =============================================================================

#[test]
fn test_plan_text() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);

    qm(dir.path())
        .arg("plan")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("helmet -> +6: items0[1], items0[2]"))
        .stdout(predicate::str::contains("nothing to compound"));
}

#[test]
fn test_plan_json() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);

    let output = qm(dir.path())
        .args(["plan", "-f", "json"])
        .arg(&snapshot)
        .output()
        .expect("run qm");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json output");
    let upgrades = report["upgrade"].as_array().expect("upgrade list");
    assert_eq!(upgrades.len(), 1);
    assert_eq!(upgrades[0]["name"], "helmet");
    assert_eq!(upgrades[0]["target_level"], 6);
    assert!(report["compound"].as_array().expect("compound list").is_empty());
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    qm(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("container-capacity: 42"))
        .stdout(predicate::str::contains("timeout-ms: 30000"));
}

#[test]
fn test_config_from_local_file() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join(".quartermaster.yml"),
        "log-level: debug\nbank:\n  container-capacity: 10\n",
    )
    .expect("write config");

    qm(dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("container-capacity: 10"))
        .stdout(predicate::str::contains("log-level: debug"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    qm(dir.path())
        .args(["--config", "missing.yml", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn test_invalid_log_level_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    qm(dir.path())
        .args(["--log-level", "loud", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid log level"));
}

// =============================================================================
// Simulate Tests
// =============================================================================

#[test]
fn test_simulate_upgrades_and_reports_bank() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);

    qm(dir.path())
        .arg("simulate")
        .arg(&snapshot)
        .args(["--gold", "100000", "--rounds", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("done refresh_bank"))
        .stdout(predicate::str::contains("done upgrade_items"))
        .stdout(predicate::str::contains("consistent"))
        .stdout(predicate::str::contains("\"items0\""));
}

#[test]
fn test_simulate_stores_carried_inventory() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let snapshot = write_snapshot(&dir);
    let inventory = dir.path().join("inventory.json");
    fs::write(&inventory, r#"[{"name": "bow"}, null, {"name": "hpot0", "q": 30}]"#).expect("write inventory");

    qm(dir.path())
        .arg("simulate")
        .arg(&snapshot)
        .arg("--inventory")
        .arg(&inventory)
        .args(["--rounds", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"bow\""));
}
