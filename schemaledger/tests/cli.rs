//! Smoke tests for the `schemaledger` binary. None of these reach AWS.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn schemaledger(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schemaledger"))
        .arg("--root")
        .arg(root)
        .arg("--no-color")
        .args(args)
        .env_remove("SCHEMALEDGER_ROOT")
        .env("RUST_LOG", "error")
        .output()
        .expect("binary should run")
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

const LEDGER: &str = r#"{
  "AWS::S3::Bucket": {
    "deprecation_status": "LIVE",
    "first_seen": "2024-05-01T12:00:00.000000Z",
    "last_updated": "2024-05-02T12:00:00.000000Z"
  }
}
"#;

const REMOVED: &str = r#"{
  "AWS::SQS::Queue": {
    "first_seen": "2024-04-01T12:00:00.000000Z",
    "last_updated": "2024-04-01T12:00:00.000000Z",
    "removed_date": "2024-05-02T12:00:00.000000Z"
  }
}
"#;

// ============ init ============

#[test]
fn init_writes_config_and_schemas_dir() {
    let dir = TempDir::new().unwrap();

    let output = schemaledger(dir.path(), &["init"]);
    assert!(output.status.success(), "{output:?}");
    assert!(dir.path().join("schemaledger.toml").exists());
    assert!(dir.path().join("schemas").is_dir());

    let again = schemaledger(dir.path(), &["init"]);
    assert_eq!(again.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&again.stderr).contains("Error:"));
}

// ============ status / show ============

#[test]
fn status_reports_ledger_counts_as_json() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "version_metadata.json", LEDGER);
    write(dir.path(), "removed_schemas.json", REMOVED);
    write(dir.path(), "schemas/AWS--S3--Bucket.json", "{}\n");
    write(dir.path(), "schemas/AWS--EC2--Instance.json", "{}\n");

    let output = schemaledger(dir.path(), &["--output", "json", "status"]);
    assert!(output.status.success(), "{output:?}");

    let summary: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(summary["active"], 1);
    assert_eq!(summary["removed"], 1);
    assert_eq!(summary["documents"], 2);
    assert_eq!(summary["untracked_documents"][0], "AWS::EC2::Instance");
    assert_eq!(summary["recent"][0]["type_name"], "AWS::S3::Bucket");
}

#[test]
fn show_reports_removed_types() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "version_metadata.json", LEDGER);
    write(dir.path(), "removed_schemas.json", REMOVED);

    let output = schemaledger(dir.path(), &["--output", "json", "show", "AWS::SQS::Queue"]);
    assert!(output.status.success(), "{output:?}");

    let details: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(details["state"], "removed");
    assert_eq!(details["removed_date"], "2024-05-02T12:00:00.000000Z");
    assert_eq!(details["document_exists"], false);
}

#[test]
fn show_unknown_type_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "version_metadata.json", LEDGER);

    let output = schemaledger(dir.path(), &["show", "AWS::Nope::Missing"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "schemaledger.toml",
        "[guard]\nmax_removal_ratio = 3.0\n",
    );

    let output = schemaledger(dir.path(), &["status"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_removal_ratio"));
}
