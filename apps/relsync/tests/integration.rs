//! Integration tests for the relsync CLI

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Empty config file and a store path inside a fresh temp dir
fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "").unwrap();
    let db = temp_dir.path().join("data").join("relsync.sqlite");
    (temp_dir, config, db)
}

fn relsync(config: &Path, db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_relsync"))
        .arg("--config")
        .arg(config)
        .arg("--db")
        .arg(db)
        .args(args)
        .env_remove("RELSYNC_OUTPUT")
        .env_remove("RELSYNC_DB_PATH")
        .env_remove("RELSYNC_SPACE_API_URL")
        .env_remove("RELSYNC_SPACE_API_TIMEOUT")
        .env_remove("RELSYNC_CLUSTER_BIZ_OVERRIDES")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute relsync")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_relsync"))
        .arg("--version")
        .output()
        .expect("Failed to execute relsync");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("relsync"));
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_relsync"))
        .arg("--help")
        .output()
        .expect("Failed to execute relsync");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cluster"));
    assert!(stdout.contains("datalink"));
    assert!(stdout.contains("migrate"));
}

#[test]
fn test_cli_invalid_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_relsync"))
        .arg("invalid-command")
        .output()
        .expect("Failed to execute relsync");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn test_migrate_creates_the_store() {
    let (_temp_dir, config, db) = workspace();

    let value = stdout_json(&relsync(&config, &db, &["--json", "migrate"]));

    assert_eq!(value["migrated"], true);
    assert!(db.exists());
}

#[test]
fn test_cluster_sync_on_empty_store() {
    let (_temp_dir, config, db) = workspace();

    let value = stdout_json(&relsync(&config, &db, &["--json", "cluster", "sync"]));

    assert_eq!(value["desired"], 0);
    assert_eq!(value["added"], 0);
    assert_eq!(value["deleted"], 0);
}

#[test]
fn test_biz_ids_of_unknown_cluster() {
    let (_temp_dir, config, db) = workspace();

    let value = stdout_json(&relsync(
        &config,
        &db,
        &["--json", "cluster", "biz-ids", "BCS-K8S-00000"],
    ));

    assert_eq!(value["cluster_id"], "BCS-K8S-00000");
    assert_eq!(value["biz_ids"], serde_json::json!([]));
}

#[test]
fn test_datalink_dry_run_on_empty_store() {
    let (_temp_dir, config, db) = workspace();

    let value = stdout_json(&relsync(
        &config,
        &db,
        &[
            "--json",
            "datalink",
            "rebuild",
            "--tenant",
            "system",
            "--namespace",
            "bkmonitor",
            "--dry-run",
        ],
    ));

    assert_eq!(value["dry_run"], true);
    assert_eq!(value["total"], 0);
    assert_eq!(value["bk_tenant_id"], "system");
}

#[test]
fn test_unreadable_config_fails() {
    let (temp_dir, _config, db) = workspace();
    let broken = temp_dir.path().join("broken.toml");
    std::fs::write(&broken, "[database\nmax_connections = ").unwrap();

    let output = relsync(&broken, &db, &["migrate"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration error"));
}
