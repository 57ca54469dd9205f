//! Integration tests for the `lwf` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const STRUCTURE: &str = r#"{
    "investors": [
        {"id": "a", "name": "Alice Founder"},
        {"id": "b", "name": "Bravo Ventures", "email": "ops@bravo.example"}
    ],
    "share_classes": [
        {"id": "common", "name": "Common", "original_issue_price": "0.0001"},
        {
            "id": "series_a",
            "name": "Series A Preferred",
            "original_issue_price": "100",
            "liquidation_preference_multiple": "1",
            "preferred": true,
            "seniority_rank": 1
        }
    ],
    "holdings": [
        {"investor_id": "a", "share_class_id": "common", "number_of_shares": 1000},
        {"investor_id": "b", "share_class_id": "series_a", "number_of_shares": 500}
    ]
}"#;

fn json_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn waterfall_input(exit_amount: &str) -> String {
    format!(r#"{{"exit_amount": "{exit_amount}", "equity_structure": {STRUCTURE}}}"#)
}

fn lwf() -> Command {
    Command::cargo_bin("lwf").unwrap()
}

#[test]
fn test_waterfall_json_from_input_file() {
    let file = json_file(&waterfall_input("10000000"));
    let assert = lwf()
        .args(["waterfall", "--input"])
        .arg(file.path())
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["result"]["total_distributed"], "10000000");
    assert_eq!(value["result"]["payouts"].as_array().unwrap().len(), 2);
}

#[test]
fn test_waterfall_minimal_with_structure_and_flag() {
    let file = json_file(STRUCTURE);
    lwf()
        .args(["waterfall", "--output", "minimal", "--exit-amount", "2000000", "--structure"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("2000000\n"));
}

#[test]
fn test_waterfall_from_stdin() {
    lwf()
        .args(["waterfall", "--output", "csv"])
        .write_stdin(waterfall_input("10000000"))
        .assert()
        .success()
        .stdout(predicate::str::contains("investor_id"))
        .stdout(predicate::str::contains("Bravo Ventures"));
}

#[test]
fn test_exit_amount_flag_overrides_file() {
    let file = json_file(&waterfall_input("10000000"));
    lwf()
        .args(["waterfall", "--output", "minimal", "--exit-amount", "3000000", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("3000000\n"));
}

#[test]
fn test_zero_exit_amount_fails() {
    let file = json_file(&waterfall_input("0"));
    lwf()
        .args(["waterfall", "--input"])
        .arg(file.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("exit_amount"));
}

#[test]
fn test_missing_input_fails() {
    lwf()
        .arg("waterfall")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_exit_range_sweep_csv() {
    let file = json_file(STRUCTURE);
    lwf()
        .args([
            "exit-range", "--output", "csv", "--min", "5000000", "--max", "15000000", "--step",
            "5000000", "--structure",
        ])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice Founder"))
        .stdout(predicate::str::contains("15000000"));
}

#[test]
fn test_table_output() {
    let file = json_file(&waterfall_input("10000000"));
    lwf()
        .args(["waterfall", "--output", "table", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("payouts:"))
        .stdout(predicate::str::contains("Methodology:"));
}

#[test]
fn test_version() {
    lwf()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("lwf "));
}
