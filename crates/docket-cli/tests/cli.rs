use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

const BOL_TEXT: &str = "\
BILL OF LADING
B/L No: MEDU12345678
Shipper: Frigorifico Sul Ltda
Consignee: Nordic Foods GmbH
Container No: MSCU1234567
Vessel: RHINE MAERSK
Port of Loading: SANTOS
Port of Discharge: ROTTERDAM
Gross Weight: 25,000.00 KGS
";

fn docket() -> Command {
    Command::cargo_bin("docket").unwrap()
}

fn write_store(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("store.json");
    let store = json!({
        "shipments": [{
            "id": "S-1",
            "product_type": "general",
            "container_number": "TBD"
        }],
        "documents": [{
            "id": "BOL-1",
            "shipment_id": "S-1",
            "document_type": "bill_of_lading",
            "raw_text": BOL_TEXT
        }]
    });
    fs::write(&path, serde_json::to_string_pretty(&store).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_extract_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bol.txt");
    fs::write(&input, BOL_TEXT).unwrap();

    docket()
        .args(["extract", input.to_str().unwrap(), "--type", "bol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MSCU1234567"))
        .stdout(predicate::str::contains("RHINE MAERSK"));
}

#[test]
fn test_extract_detects_type() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bol.txt");
    fs::write(&input, BOL_TEXT).unwrap();

    docket()
        .args(["extract", input.to_str().unwrap(), "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Document type: bill_of_lading"));
}

#[test]
fn test_extract_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bol.txt");
    fs::write(&input, BOL_TEXT).unwrap();

    docket()
        .args(["extract", input.to_str().unwrap(), "--type", "manifest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown document type"));
}

#[test]
fn test_extract_missing_file() {
    docket()
        .args(["extract", "/nonexistent/bol.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_batch_with_summary() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), BOL_TEXT).unwrap();
    fs::write(dir.path().join("b.txt"), "PACKING LIST\nGross Weight: 20,000.00 KGS\n").unwrap();
    let out = dir.path().join("out");
    let pattern = dir.path().join("*.txt");

    docket()
        .args([
            "batch",
            pattern.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
            "--summary",
            "-j",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());
    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("MSCU1234567"));
    assert_eq!(summary.lines().count(), 3);
}

#[test]
fn test_validate_records_audit() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());

    let output = docket()
        .args(["validate", "S-1", "--store", store.to_str().unwrap(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    // invoice and packing list are missing
    assert_eq!(report["decision"], "REJECT");

    let saved = read_json(&store);
    assert_eq!(saved["audit"][0]["action"], "shipment.validated");
}

#[test]
fn test_validate_fail_on_reject() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());

    docket()
        .args(["validate", "S-1", "--store", store.to_str().unwrap(), "--fail-on-reject"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("was rejected"));
}

#[test]
fn test_preview_then_apply() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());
    let preview = dir.path().join("preview.json");

    docket()
        .args([
            "sync",
            "preview",
            "BOL-1",
            "--store",
            store.to_str().unwrap(),
            "--save",
            preview.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-sync: yes"));

    docket()
        .args([
            "sync",
            "apply",
            "BOL-1",
            "--store",
            store.to_str().unwrap(),
            "--actor",
            "user:ana",
            "--preview",
            preview.to_str().unwrap(),
            "--field",
            "container_number,vessel_name",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("written"));

    let saved = read_json(&store);
    assert_eq!(saved["shipments"][0]["container_number"], "MSCU1234567");
    assert_eq!(saved["shipments"][0]["vessel_name"], "RHINE MAERSK");
    assert_eq!(saved["shipments"][0]["version"], 1);
    assert_eq!(saved["audit"].as_array().unwrap().len(), 2);
}

#[test]
fn test_apply_requires_fields() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());

    docket()
        .args(["sync", "apply", "BOL-1", "--store", store.to_str().unwrap(), "--actor", "user:ana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No fields accepted"));
}

#[test]
fn test_apply_without_saved_preview() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());

    docket()
        .args([
            "sync",
            "apply",
            "BOL-1",
            "--store",
            store.to_str().unwrap(),
            "--actor",
            "user:ana",
            "--field",
            "container_number",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("written"));

    let saved = read_json(&store);
    assert_eq!(saved["shipments"][0]["container_number"], "MSCU1234567");
    assert_eq!(saved["audit"][0]["action"], "shipment.field_synced");
}

#[test]
fn test_stale_preview_conflicts() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());
    let preview = dir.path().join("preview.json");

    docket()
        .args(["sync", "preview", "BOL-1", "--store", store.to_str().unwrap(), "--save", preview.to_str().unwrap()])
        .assert()
        .success();

    let mut changed = read_json(&store);
    changed["shipments"][0]["container_number"] = json!("MAEU1234567");
    changed["shipments"][0]["version"] = json!(1);
    fs::write(&store, serde_json::to_string_pretty(&changed).unwrap()).unwrap();

    let output = docket()
        .args([
            "sync",
            "apply",
            "BOL-1",
            "--store",
            store.to_str().unwrap(),
            "--actor",
            "user:ana",
            "--preview",
            preview.to_str().unwrap(),
            "--field",
            "container_number",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["outcomes"][0]["status"], "conflicted");

    let saved = read_json(&store);
    assert_eq!(saved["shipments"][0]["container_number"], "MAEU1234567");
    assert!(saved["audit"].as_array().unwrap().is_empty());
}

#[test]
fn test_auto_sync() {
    let dir = TempDir::new().unwrap();
    let store = write_store(dir.path());

    docket()
        .args(["sync", "auto", "BOL-1", "--store", store.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"auto_synced\": true"));

    let saved = read_json(&store);
    assert_eq!(saved["shipments"][0]["container_number"], "MSCU1234567");
    assert!(
        saved["audit"]
            .as_array()
            .unwrap()
            .iter()
            .all(|e| e["actor"] == "system:auto-sync")
    );
}

#[test]
fn test_missing_store() {
    docket()
        .args(["sync", "preview", "BOL-1", "--store", "/nonexistent/store.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Store file not found"));
}

#[test]
fn test_config_init_and_get() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("docket.json");

    docket()
        .args(["-c", config.to_str().unwrap(), "config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    docket()
        .args(["-c", config.to_str().unwrap(), "config", "set", "sync.auto_sync_threshold", "0.5"])
        .assert()
        .success();

    docket()
        .args(["-c", config.to_str().unwrap(), "config", "get", "sync.auto_sync_threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.5"));

    docket()
        .args(["-c", config.to_str().unwrap(), "config", "set", "sync.auto_sync_threshold", "2"])
        .assert()
        .failure();
}
