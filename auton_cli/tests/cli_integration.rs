use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, toml: &str) -> PathBuf {
    let path = dir.path().join("auton.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn auton() -> Command {
    Command::cargo_bin("auton").unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["list"], 0, "red_right", "stdout")]
#[case(&["check"], 0, "15 routines build", "stdout")]
#[case(&["run", "drive_example"], 0, "Routine drive_example complete", "stdout")]
#[case(&["show", "interfered_example"], 0, "retry up to 3", "stdout")]
#[case(&["run", "skills"], 4, "auton list", "stderr")]
#[case(&["run"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = auton().args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn json_run_report_is_machine_readable() {
    let out = auton()
        .args(["--json", "--log-level", "warn", "run", "turn_example"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["routine"], "turn_example");
    assert_eq!(v["settled"], 3);
    assert_eq!(v["timed_out"], 0);
}

#[test]
fn obstacle_is_recovered_from() {
    let out = auton()
        .args(["--json", "run", "interfered_example", "--obstacle", "2"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["interference_resolved"], 1);
    // the blocked drive never settles and runs into its timeout
    assert_eq!(v["timed_out"], 1);
}

#[test]
fn single_attempt_budget_leaves_interference_unresolved() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[recovery]\nmax_attempts = 1\n");
    let out = auton()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "run", "interfered_example", "--obstacle", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["interference_unresolved"], 1);
}

#[test]
fn chain_tighter_than_small_window_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[chain]\ndrive = 3.0\nturn = 0.5\nswing = 5.0\n");
    auton()
        .arg("--config")
        .arg(&cfg)
        .arg("check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("chain.turn"));
}

#[test]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    auton()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("list")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[test]
fn json_errors_carry_a_reason() {
    auton()
        .args(["--json", "show", "skills"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("\"reason\":\"UnknownRoutine\""));
}

#[test]
fn file_log_is_written_as_json_lines() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("auton.log");
    let cfg = write_config(
        &dir,
        &format!(
            "[logging]\nfile = \"{}\"\nlevel = \"info\"\n",
            log.display().to_string().replace('\\', "/")
        ),
    );
    auton()
        .arg("--config")
        .arg(&cfg)
        .args(["run", "drive_example"])
        .assert()
        .success();

    let text = fs::read_to_string(&log).unwrap();
    let first = text.lines().next().unwrap();
    let v: serde_json::Value = serde_json::from_str(first).unwrap();
    assert!(v.get("level").is_some());
    assert!(text.contains("routine complete"));
}
