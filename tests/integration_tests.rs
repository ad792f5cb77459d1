//! Integration tests for the ion-import CLI
//!
//! These tests exercise the binary end-to-end using assert_cmd. Nothing here
//! talks to a live API: the network-facing commands are only driven up to the
//! point where they need credentials.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get an ion-import command with no ambient configuration
fn ion_import(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ion-import").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("ION_IMPORTER_CLIENT_ID")
        .env_remove("ION_IMPORTER_CLIENT_SECRET")
        .env_remove("ION_IMPORT_API")
        .env_remove("ION_API_AUDIENCE")
        .env_remove("ION_AUTH_DOMAIN")
        .env_remove("ION_AUTH_SCHEME")
        .env_remove("RUST_LOG");
    cmd
}

const FISHBOWL_EXPORT: &str = "\
PartNumber,PartDescription,Location,Qty,UOM,Cost,Date,Tracking-Lot Number,PartType
A-1,Widget,Shelf,2,ea,1.50,2021-03-01,L-7,Inventory
B-2,Board,Bin,2,ea,9,2021-03-02,,Serial
Serial Number
S-1
S-2
";

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help_lists_importers() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bom"))
        .stdout(predicate::str::contains("inventory"))
        .stdout(predicate::str::contains("fishbowl"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ion-import"));
}

#[test]
fn test_unknown_command_fails() {
    let home = TempDir::new().unwrap();
    ion_import(&home).arg("frobnicate").assert().failure();
}

#[test]
fn test_excel_type_defaults_to_parts() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("parts.csv");
    fs::write(&file, "Part Number,Description\nP-1,Bracket\n").unwrap();

    ion_import(&home)
        .arg("excel")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Importing parts"))
        .stderr(predicate::str::contains("client ID"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ion-import"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://localhost:5000/"))
        .stdout(predicate::str::contains("firstresonance.auth0.com"));
}

// ============================================================================
// Fishbowl Transform
// ============================================================================

#[test]
fn test_fishbowl_transform_writes_combined_csv() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("exports");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("stock.csv"), FISHBOWL_EXPORT).unwrap();
    let output = home.path().join("inventory.csv");

    ion_import(&home)
        .arg("fishbowl")
        .arg(&input)
        .arg("--output_file")
        .arg(&output)
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next().unwrap(),
        "part_number,part_description,location_name,quantity,uom,cost,created_date,lot_number,tracking_type,serial_number"
    );
    assert_eq!(written.lines().count(), 4);
    assert!(written.contains("S-1"));
    assert!(written.contains("S-2"));
    assert!(!written.contains("Serial Number"));
}

#[test]
fn test_fishbowl_missing_folder_fails() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .arg("fishbowl")
        .arg(home.path().join("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot find files"));
}

// ============================================================================
// Import Commands (offline checks)
// ============================================================================

#[test]
fn test_missing_input_file_fails_before_auth() {
    let home = TempDir::new().unwrap();
    ion_import(&home)
        .arg("bom")
        .arg(home.path().join("TOP.csv"))
        .arg("--client_id")
        .arg("abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_inventory_missing_required_column_fails() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("inventory.csv");
    fs::write(&file, "part_number,location_name\nA,Shelf\n").unwrap();

    ion_import(&home)
        .arg("inventory")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantity"));
}

#[test]
fn test_import_without_client_id_fails() {
    let home = TempDir::new().unwrap();
    let file = home.path().join("TOP.csv");
    fs::write(&file, "Level,Part Number,Qty\n1,A,1\n").unwrap();

    ion_import(&home)
        .arg("bom")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("client ID"));
}
