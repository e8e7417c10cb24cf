//! Catalog routines played through the runner on mock hardware.

use std::sync::Arc;

use auton_core::mocks::{ActuatorLog, ScriptedDrivetrain};
use auton_core::routines::{self, RoutineParams};
use auton_core::{
    AutonError, ConfigError, ConfigurationProfile, Mechanisms, MotionExecutor, RecoveryProfile,
    RoutineScript, ScriptRunner,
};
use auton_traits::{ManualClock, MotionKind};
use rstest::rstest;

fn runner(dt: ScriptedDrivetrain, clock: &ManualClock, mechanisms: Mechanisms) -> ScriptRunner<ScriptedDrivetrain> {
    let ex = MotionExecutor::new(dt, ConfigurationProfile::default(), Arc::new(clock.clone()))
        .unwrap();
    ScriptRunner::new(ex, mechanisms, RecoveryProfile::default())
}

#[test]
fn every_catalog_routine_runs_to_completion() {
    let params = RoutineParams::default();
    for info in routines::catalog() {
        let clock = ManualClock::new();
        let mut r = runner(ScriptedDrivetrain::settled(&clock), &clock, Mechanisms::noop());
        let script = info.build(&params).unwrap();
        let stats = r.run(&script).unwrap();
        assert_eq!(stats.steps, script.steps().len(), "{}", info.name);
        assert_eq!(stats.hardware_faults, 0, "{}", info.name);
        assert_eq!(stats.timed_out, 0, "{}", info.name);
        assert!(r.executor().is_idle(), "{} left a motion outstanding", info.name);
    }
}

#[test]
fn wait_until_routine_speeds_up_mid_drive() {
    let clock = ManualClock::new();
    let mut r = runner(ScriptedDrivetrain::linear(&clock, 24.0), &clock, Mechanisms::noop());
    let script = routines::by_name("wait_until_change_speed", &RoutineParams::default()).unwrap();
    let stats = r.run(&script).unwrap();

    assert_eq!(stats.progress_reached, 2);
    let dt = r.executor().drivetrain();
    assert_eq!(dt.speed_changes(), [110.0, 110.0]);
    let drives: Vec<_> = dt
        .started()
        .iter()
        .filter(|m| m.kind == MotionKind::Drive)
        .map(|m| (m.target, m.max_speed, m.slew))
        .collect();
    // both drives launch slow; the speed-ups above reach them mid-flight
    assert_eq!(drives, [(24.0, 30.0, true), (-24.0, 30.0, true)]);
}

#[test]
fn match_routine_drives_the_mechanisms_in_order() {
    let clock = ManualClock::new();
    let log = ActuatorLog::new();
    let mut r = runner(ScriptedDrivetrain::settled(&clock), &clock, log.mechanisms());
    let script = routines::by_name("red_right", &RoutineParams::default()).unwrap();
    let stats = r.run(&script).unwrap();

    assert_eq!(stats.actuator_faults, 0);
    let entries = log.entries();
    assert!(!entries.is_empty());
    let clamp = entries.iter().position(|e| e == "clamp=true");
    let intake = entries.iter().position(|e| e.starts_with("intake="));
    assert!(clamp.is_some() && intake.is_some(), "{entries:?}");
    // the goal is clamped before the intake spins up
    assert!(clamp < intake, "{entries:?}");
}

#[test]
fn interfered_example_backs_away_from_the_obstruction() {
    let clock = ManualClock::new();
    // stalled on the way out, still stuck after the first creep, free after the second
    let dt = ScriptedDrivetrain::settled(&clock).with_interference([true, false, true, false, false]);
    let mut r = runner(dt, &clock, Mechanisms::noop());
    let script = routines::by_name("interfered_example", &RoutineParams::default()).unwrap();
    let stats = r.run(&script).unwrap();

    assert_eq!(stats.interference_resolved, 1);
    let targets: Vec<_> = r
        .executor()
        .drivetrain()
        .started()
        .iter()
        .map(|m| (m.kind, m.target))
        .collect();
    assert_eq!(
        targets,
        [
            (MotionKind::Drive, 24.0),
            (MotionKind::Drive, -2.0),
            (MotionKind::Drive, -2.0),
            (MotionKind::Turn, 90.0),
        ]
    );
}

#[rstest]
#[case::drive("drive_example", 3)]
#[case::turn("turn_example", 3)]
#[case::swing("swing_example", 4)]
fn tuning_routines_issue_one_motion_per_step(#[case] name: &str, #[case] motions: usize) {
    let clock = ManualClock::new();
    let mut r = runner(ScriptedDrivetrain::settled(&clock), &clock, Mechanisms::noop());
    let script = routines::by_name(name, &RoutineParams::default()).unwrap();
    let stats = r.run(&script).unwrap();
    assert_eq!(r.executor().drivetrain().started().len(), motions);
    assert_eq!(stats.settled, motions);
}

#[test]
fn drivetrain_faults_are_counted_not_fatal() {
    let clock = ManualClock::new();
    let log = ActuatorLog::new();
    let mut r = runner(ScriptedDrivetrain::failing_sample(&clock), &clock, log.mechanisms());
    let script = RoutineScript::builder("unplugged")
        .drive(24.0, 110.0)
        .clamp()
        .turn(90.0, 90.0)
        .build()
        .unwrap();
    let stats = r.run(&script).unwrap();
    assert_eq!(stats.hardware_faults, 2);
    assert_eq!(log.entries(), ["clamp=true"]);
    assert!(r.executor().is_idle());
}

#[test]
fn profile_is_applied_exactly_once() {
    let clock = ManualClock::new();
    let r = runner(ScriptedDrivetrain::settled(&clock), &clock, Mechanisms::noop());
    let dt = r.executor().drivetrain();
    assert_eq!(dt.gains().len(), 4);
    assert_eq!(dt.exits().len(), 3);
    assert_eq!(dt.chains().len(), 3);
}

#[test]
fn malformed_profile_touches_nothing() {
    let clock = ManualClock::new();
    let mut dt = ScriptedDrivetrain::settled(&clock);
    let mut profile = ConfigurationProfile::default();
    profile.chain.turn = 0.5;

    let err = profile.apply(&mut dt).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AutonError>(),
        Some(AutonError::Config(ConfigError::ChainThreshold { kind: MotionKind::Turn, .. }))
    ));
    assert!(dt.gains().is_empty());
    assert!(dt.exits().is_empty());
}
