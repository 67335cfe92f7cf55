// SPDX-License-Identifier: Apache-2.0
#![allow(clippy::unwrap_used)]

//! End-to-end coverage of the `marble-cli` subcommands against real board
//! files on disk, driven the way an operator would from a shell.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write as _;
use tempfile::NamedTempFile;

fn write_board(placements_json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let body = format!(
        r#"{{"version":1,"board":{{"size":[16,16,16],"placements":[{placements_json}]}}}}"#
    );
    file.write_all(body.as_bytes()).unwrap();
    file
}

fn straight_at(x: i32) -> String {
    format!(
        r#"{{"part":{{"Connector":"Straight"}},"rotation":"Deg0","cell":{{"x":{x},"y":0,"z":0}},"upgrade":0}}"#
    )
}

#[test]
fn load_reports_the_placement_count() {
    let board = write_board(&straight_at(0));
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("load")
        .arg(board.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("loaded 1 placements"));
}

#[test]
fn step_advances_the_tick_counter_and_reports_a_summary() {
    let board = write_board(&straight_at(0));
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("step")
        .arg(board.path())
        .arg("--ticks")
        .arg("5")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick=5"));
}

#[test]
fn run_until_reaches_the_requested_tick() {
    // Within the default overrun ceiling (8 ticks per `run_until` call), so
    // the target is reached in a single call rather than being cut short.
    let board = write_board(&straight_at(0));
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("run")
        .arg(board.path())
        .arg("--until")
        .arg("5")
        .assert()
        .success()
        .stdout(predicate::str::contains("tick=5"));
}

#[test]
fn reset_returns_the_tick_counter_to_zero() {
    let board = write_board(&straight_at(0));
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("reset")
        .arg(board.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("tick after reset: 0"));
}

#[test]
fn inspect_prints_board_metadata_without_stepping() {
    let placements = format!("{},{}", straight_at(0), straight_at(10));
    let board = write_board(&placements);
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("inspect")
        .arg(board.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("placements=2"));
}

#[test]
fn load_fails_gracefully_on_a_missing_file() {
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("load")
        .arg("/nonexistent/board.json")
        .assert()
        .failure();
}

#[test]
fn load_fails_gracefully_on_malformed_json() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"not json").unwrap();
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("load")
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn adjacency_violation_in_the_board_file_is_rejected_at_load_time() {
    // Two Straight connectors directly adjacent violate the alternation
    // invariant (no module between them).
    let placements = format!("{},{}", straight_at(0), straight_at(1));
    let board = write_board(&placements);
    Command::cargo_bin("marble-cli")
        .unwrap()
        .arg("load")
        .arg(board.path())
        .assert()
        .failure();
}
