//! Integration tests for tracked-time commands via CLI.
//!
//! Covers single adds with validation, CSV bulk import with per-row error
//! collection, and list filtering by member and normalized label.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_time_add_outputs_entry() {
    let env = TestEnv::init();

    env.bp()
        .args([
            "time", "add", "CRUD", "4.5", "--member", "sam", "--team", "backend",
            "--date", "2026-03-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"feature_label\":\"CRUD\""))
        .stdout(predicate::str::contains("\"hours\":4.5"))
        .stdout(predicate::str::contains("\"date\":\"2026-03-01\""));
}

#[test]
fn test_time_add_rejects_non_positive_hours() {
    let env = TestEnv::init();

    env.bp()
        .args(["time", "add", "CRUD", "0", "--member", "sam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hours"));

    env.bp()
        .args(["time", "add", "CRUD", "-2", "--member", "sam"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hours"));
}

#[test]
fn test_time_add_rejects_bad_date() {
    let env = TestEnv::init();

    env.bp()
        .args([
            "time", "add", "CRUD", "2", "--member", "sam", "--date", "March 1st",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("date"));
}

#[test]
fn test_time_list_filters() {
    let env = TestEnv::init();

    for (label, hours, member) in [
        ("CRUD", "3.5", "sam"),
        ("  crud ", "4.0", "alex"),
        ("websocket", "9.0", "sam"),
    ] {
        env.bp()
            .args(["time", "add", label, hours, "--member", member])
            .assert()
            .success();
    }

    // label filter groups case/whitespace variants together
    env.bp()
        .args(["time", "list", "--feature", "Crud"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":2"));

    env.bp()
        .args(["time", "list", "--member", "sam"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":2"));

    env.bp()
        .args(["time", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":3"));
}

#[test]
fn test_time_import_csv() {
    let env = TestEnv::init();

    let csv = "team,member,feature,hours,date\n\
               backend,sam,CRUD,3.5,2026-02-01\n\
               backend,alex,CRUD,4.0,\n\
               frontend,kim,\"design, system\",6.0,2026-02-03\n";
    let csv_path = env.path().join("hours.csv");
    std::fs::write(&csv_path, csv).unwrap();

    env.bp()
        .args(["time", "import", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\":3"))
        .stdout(predicate::str::contains("\"errors\":[]"));

    // quoted field with an embedded comma survived as one label
    env.bp()
        .args(["time", "list", "--feature", "design, system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":1"));
}

#[test]
fn test_time_import_collects_row_errors() {
    let env = TestEnv::init();

    let csv = "team,member,feature,hours\n\
               backend,sam,CRUD,3.5\n\
               ops,sam,CRUD,2.0\n\
               backend,alex,CRUD,lots\n\
               backend,kim,CRUD,-4\n\
               backend,dana,websocket,8.0\n";
    let csv_path = env.path().join("hours.csv");
    std::fs::write(&csv_path, csv).unwrap();

    // good rows land, each bad row is reported with its row number
    env.bp()
        .args(["time", "import", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\":2"))
        .stdout(predicate::str::contains("\"row\":3"))
        .stdout(predicate::str::contains("\"row\":4"))
        .stdout(predicate::str::contains("\"row\":5"));

    env.bp()
        .args(["time", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":2"));
}

#[test]
fn test_time_import_missing_required_column() {
    let env = TestEnv::init();

    let csv = "team,member,hours\nbackend,sam,3.5\n";
    let csv_path = env.path().join("hours.csv");
    std::fs::write(&csv_path, csv).unwrap();

    env.bp()
        .args(["time", "import", csv_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("feature"));
}

#[test]
fn test_time_import_human_output() {
    let env = TestEnv::init();

    let csv = "team,member,feature,hours\nbackend,sam,CRUD,3.5\nops,x,y,1\n";
    let csv_path = env.path().join("hours.csv");
    std::fs::write(&csv_path, csv).unwrap();

    env.bp()
        .args(["--human", "time", "import", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 entr(ies)"))
        .stdout(predicate::str::contains("row 3:"));
}
