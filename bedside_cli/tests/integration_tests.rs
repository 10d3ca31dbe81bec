//! Integration tests for the bedside binary.
//!
//! These tests verify end-to-end behavior including:
//! - Bed selection and record editing
//! - Derived values after saving
//! - Resuscitation simulation and report output
//! - Shift notes and reminders

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a small ward config so tests never read the user's config
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        r#"
[ward]
beds = ["1-1", "1-2", "5"]

[resuscitation]
round_seconds = 120
metronome_bpm = 110
adrenaline_dose_mg = 1.0
default_joules = 200
"#,
    )
    .expect("Failed to write config");
    path
}

/// Command pointed at a temp data dir and config
fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bedside"));
    cmd.arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .arg("--config")
        .arg(write_config(temp_dir.path()));
    cmd
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("bedside"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bedside ICU reference"));
}

#[test]
fn test_default_command_lists_beds() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("1-1"))
        .stdout(predicate::str::contains("1-2"))
        .stdout(predicate::str::contains("* 1-1"));
}

#[test]
fn test_select_persists() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["select", "1-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Selected bed 1-2"));

    cli(&temp_dir)
        .arg("beds")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 1-2"));
}

#[test]
fn test_select_unknown_bed_keeps_selection() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["select", "9-9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("selection unchanged (1-1)"));
}

#[test]
fn test_set_recomputes_derived_values() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "name=Test Patient", "sex=m", "height_cm=180", "weight_kg=80"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved bed 1-1"))
        .stdout(predicate::str::contains("IBW: 75.1 kg"))
        .stdout(predicate::str::contains("BMI: 24.7"));

    let output = cli(&temp_dir)
        .args(["show", "--json"])
        .output()
        .expect("Failed to run show");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("show --json should print JSON");
    assert_eq!(value["record"]["name"], "Test Patient");
    assert_eq!(value["record"]["ideal_body_weight"], 75.1);
    assert_eq!(value["record"]["body_mass_index"], 24.7);
}

#[test]
fn test_set_nested_field_and_indices() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "gas_exchange.fio2=40", "gas_exchange.pao2=80"])
        .assert()
        .success();

    cli(&temp_dir)
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("P/F ratio: 200.0"));
}

#[test]
fn test_set_rejects_derived_field() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "ideal_body_weight=70"])
        .assert()
        .failure();

    cli(&temp_dir)
        .args(["set", "no_such_field=1"])
        .assert()
        .failure();

    cli(&temp_dir).args(["set", "weight_kg"]).assert().failure();
}

#[test]
fn test_clear_current_bed() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "name=Someone", "age=70"])
        .assert()
        .success();

    cli(&temp_dir)
        .arg("clear")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared bed 1-1"));

    let output = cli(&temp_dir).args(["show", "--json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["record"]["name"], "");
    assert!(value["record"]["age"].is_null());
}

#[test]
fn test_reset_all_requires_confirmation() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "name=Someone"])
        .assert()
        .success();

    cli(&temp_dir).arg("reset-all").assert().failure();

    cli(&temp_dir)
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Someone"));

    cli(&temp_dir)
        .args(["reset-all", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Emptied 3 beds"));

    cli(&temp_dir)
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Someone").not());
}

#[test]
fn test_beds_file_uses_storage_key() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir).args(["set", "age=55"]).assert().success();

    let beds_path = temp_dir.path().join("data/icu_beds_data.json");
    let contents = fs::read_to_string(&beds_path).expect("Failed to read beds file");
    let beds: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(beds.as_array().unwrap().len(), 3);
    assert_eq!(beds[0]["age"], 55.0);
}

#[test]
fn test_resus_simulate_report() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args([
            "resus",
            "simulate",
            "--seconds",
            "250",
            "--adrenaline-at",
            "30",
            "--shock-at",
            "10",
            "--shock-at",
            "130",
            "--joules",
            "150",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Resuscitation report"))
        .stdout(predicate::str::contains("Duration: 04:10"))
        .stdout(predicate::str::contains("Rounds: 2"))
        .stdout(predicate::str::contains("Shocks: 2"))
        .stdout(predicate::str::contains("Adrenaline: 1 mg"))
        .stdout(predicate::str::contains("Shock 1 delivered (150 J)"))
        .stdout(predicate::str::contains("Adrenaline 1 mg (dose 1)"))
        .stdout(predicate::str::contains("Round 2 completed - switch!"));
}

#[test]
fn test_resus_simulate_json_and_csv() {
    let temp_dir = setup_test_dir();
    let csv_path = temp_dir.path().join("events.csv");

    let output = cli(&temp_dir)
        .args(["resus", "simulate", "--seconds", "125", "--shock-at", "5"])
        .arg("--csv")
        .arg(&csv_path)
        .arg("--json")
        .output()
        .expect("Failed to run simulate");
    assert!(output.status.success());

    let snapshot: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(snapshot["elapsed_seconds"], 125);
    assert_eq!(snapshot["round_count"], 1);
    assert_eq!(snapshot["shock_count"], 1);
    assert_eq!(snapshot["running"], false);

    let csv = fs::read_to_string(&csv_path).expect("CSV should be written");
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("timestamp,category,message"));
    assert!(csv.contains("Shock 1 delivered (200 J)"));
    assert!(csv.contains("Round 1 completed - switch!"));
}

#[test]
fn test_resus_simulate_without_events() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["resus", "simulate", "--seconds", "30", "--no-metronome"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no events)"))
        .stdout(predicate::str::contains("Metronome beats: 0"));
}

#[test]
fn test_resus_tones_written() {
    let temp_dir = setup_test_dir();
    let out = temp_dir.path().join("tones");

    cli(&temp_dir)
        .args(["resus", "tones", "--out"])
        .arg(&out)
        .assert()
        .success();

    for name in ["tick.wav", "alarm.wav"] {
        let bytes = fs::read(out.join(name)).expect("tone file should exist");
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }
}

#[test]
fn test_notes_workflow() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["notes", "add", "--bed", "1-2", "--high", "Check", "potassium"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added to bed 1-2"));

    cli(&temp_dir)
        .args(["notes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HIGH"))
        .stdout(predicate::str::contains("Check potassium"));

    let notes_path = temp_dir.path().join("data/smart_notes_data.json");
    let notes: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&notes_path).unwrap()).unwrap();
    let id = notes[0]["id"].as_str().unwrap().to_string();

    cli(&temp_dir)
        .args(["notes", "done", &id[..8]])
        .assert()
        .success();

    cli(&temp_dir)
        .args(["notes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes."));

    cli(&temp_dir)
        .args(["notes", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[x]"));

    cli(&temp_dir)
        .args(["notes", "delete", &id])
        .assert()
        .success();

    cli(&temp_dir)
        .args(["notes", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes."));
}

#[test]
fn test_notes_add_defaults_to_selected_bed() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir).args(["select", "5"]).assert().success();

    cli(&temp_dir)
        .args(["notes", "add", "Turn", "patient"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added to bed 5"));

    cli(&temp_dir)
        .args(["notes", "add", "--bed", "9-9", "Nothing"])
        .assert()
        .failure();
}

#[test]
fn test_due_reminders_fire_once() {
    let temp_dir = setup_test_dir();

    // A reminder due now fires on the next check
    cli(&temp_dir)
        .args(["notes", "add", "--bed", "1-1", "--remind-in", "0", "Repeat", "gas"])
        .assert()
        .success();

    cli(&temp_dir)
        .args(["notes", "due"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ICU action: 1-1: Repeat gas"));

    cli(&temp_dir)
        .args(["notes", "due"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reminders due."));
}

#[test]
fn test_out_of_range_reminder_rejected() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["notes", "add", "--remind-in", "9223372036854775807", "Far", "future"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("remind_in"))
        .stderr(predicate::str::contains("panicked").not());

    cli(&temp_dir)
        .args(["notes", "add", "--remind-in=-5", "Already", "late"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("remind_in"));

    cli(&temp_dir)
        .args(["notes", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No notes."));
}

#[test]
fn test_set_legacy_sex_code_and_fractional_age() {
    let temp_dir = setup_test_dir();

    cli(&temp_dir)
        .args(["set", "sex=V", "age=54.5", "height_cm=170"])
        .assert()
        .success()
        .stdout(predicate::str::contains("IBW: 61.5 kg"));

    let output = cli(&temp_dir).args(["show", "--json"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["record"]["sex"], "female");
    assert_eq!(value["record"]["age"], 54.5);
}
