//! End-to-end tests for the edaflow binary

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn edaflow_cmd() -> Command {
    let mut cmd = Command::cargo_bin("edaflow").unwrap();
    for var in [
        "EDAFLOW_BACKEND",
        "EDAFLOW_ARCH",
        "EDAFLOW_WORK_ROOT",
        "EDAFLOW_JSON",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const BLINKY: &str = r#"
[design]
name = "blinky"
toplevel = "top"

[flow]
backend = "nextpnr"
arch = "ice40"

[options]
package = "sg48"

[[files]]
name = "blinky.json"
file_type = "jsonNetlist"

[[files]]
name = "pins.pcf"
file_type = "PCF"

[[files]]
name = "notes.txt"
file_type = "text"
"#;

fn write_manifest(dir: &Path, content: &str) {
    fs::write(dir.join("edaflow.toml"), content).unwrap();
}

// ══════════════════════════════════════════════════════════════════════════════
// HELP
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_help_lists_commands_and_environment() {
    edaflow_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("variants"))
        .stdout(predicate::str::contains("EDAFLOW_BACKEND"));
}

// ══════════════════════════════════════════════════════════════════════════════
// GENERATE
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_generate_writes_makefile() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);

    edaflow_cmd()
        .current_dir(temp_dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Variant: nextpnr ice40"))
        .stdout(predicate::str::contains("Default targets: blinky.asc"))
        .stdout(predicate::str::contains("Unused files: 1"));

    let makefile = fs::read_to_string(temp_dir.path().join("build").join("Makefile")).unwrap();
    assert!(makefile.starts_with("# Auto generated by edaflow"));
    assert!(makefile.contains("--pcf pins.pcf"));
    assert!(makefile.contains("--package sg48"));
}

#[test]
fn test_generate_from_subdirectory() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);
    let nested = temp_dir.path().join("rtl");
    fs::create_dir(&nested).unwrap();

    edaflow_cmd()
        .current_dir(&nested)
        .args(["generate", "--work-root", "out"])
        .assert()
        .success();

    assert!(nested.join("out").join("Makefile").is_file());
}

#[test]
fn test_generate_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);

    let output = edaflow_cmd()
        .current_dir(temp_dir.path())
        .args(["generate", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["variant"], "nextpnr ice40");
    assert_eq!(value["default_targets"][0], "blinky.asc");
    assert_eq!(value["artifacts"][0]["file_type"], "iceboxAscii");
    assert_eq!(value["unused_files"][0]["name"], "notes.txt");
}

#[test]
fn test_generate_missing_option_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);

    edaflow_cmd()
        .current_dir(temp_dir.path())
        .args(["generate", "--arch", "gowin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("device"));

    assert!(!temp_dir.path().join("build").join("Makefile").exists());
}

#[test]
fn test_generate_unsupported_arch_fails() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);

    edaflow_cmd()
        .current_dir(temp_dir.path())
        .args(["generate", "--arch", "virtex2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("virtex2"));
}

#[test]
fn test_generate_without_manifest_fails() {
    let temp_dir = TempDir::new().unwrap();

    edaflow_cmd()
        .current_dir(temp_dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No flow manifest found"));
}

#[test]
fn test_env_backend_override() {
    let temp_dir = TempDir::new().unwrap();
    write_manifest(temp_dir.path(), BLINKY);

    edaflow_cmd()
        .current_dir(temp_dir.path())
        .env("EDAFLOW_ARCH", "ecp5")
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Variant: nextpnr ecp5"));
}

// ══════════════════════════════════════════════════════════════════════════════
// VARIANTS
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_variants_table() {
    edaflow_cmd()
        .arg("variants")
        .assert()
        .success()
        .stdout(predicate::str::contains("symbiflow-vpr"))
        .stdout(predicate::str::contains("quicklogic"))
        .stdout(predicate::str::contains("part,package"));
}

#[test]
fn test_variants_json() {
    let output = edaflow_cmd().args(["variants", "--json"]).output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value.as_array().unwrap();
    assert_eq!(entries.len(), 10);
    assert!(entries
        .iter()
        .any(|e| e["backend"] == "nextpnr" && e["arch"] == "gowin" && e["subflows"] == false));
}
