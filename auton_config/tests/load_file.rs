use std::fs;

use auton_config::load_file;
use tempfile::tempdir;

#[test]
fn loads_and_validates_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("auton.toml");
    fs::write(&path, "[speeds]\ndrive = 100\n").unwrap();

    let cfg = load_file(&path).expect("valid file");
    assert_eq!(cfg.speeds.drive, 100.0);
    assert_eq!(cfg.speeds.turn, 90.0);
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    let err = load_file(&path).expect_err("missing file");
    assert!(format!("{err}").contains("nope.toml"));
}

#[test]
fn invalid_values_fail_after_parse() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[executor]\npoll_ms = 0\n").unwrap();
    let err = load_file(&path).expect_err("invalid");
    assert!(format!("{err}").contains("executor.poll_ms"));
}

#[test]
fn shipped_config_matches_builtin_tuning() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/auton.toml");
    let cfg = load_file(&path).expect("shipped config is valid");
    let builtin = auton_config::Config::default();
    assert_eq!(cfg.exit.drive.max_time_ms, builtin.exit.drive.max_time_ms);
    assert_eq!(cfg.pid.turn.start_i, Some(15.0));
    assert_eq!(cfg.chain.swing, builtin.chain.swing);
    assert_eq!(cfg.recovery.max_attempts, builtin.recovery.max_attempts);
    assert_eq!(cfg.logging.rotation.as_deref(), Some("never"));
}
