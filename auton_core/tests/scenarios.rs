//! End-to-end motion scenarios on a deterministic clock.

use std::sync::Arc;
use std::time::Duration;

use auton_core::mocks::{ActuatorLog, ScriptedDrivetrain};
use auton_core::{
    ConfigurationProfile, MotionExecutor, MotionRequest, PolicyState, RecoveryProfile,
    RoutineScript, ScriptRunner, SettleReason, WaitMode, WaitStatus,
};
use auton_traits::{ManualClock, MotionKind, MotionSample};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn executor(
    dt: ScriptedDrivetrain,
    profile: ConfigurationProfile,
    clock: &ManualClock,
) -> MotionExecutor<ScriptedDrivetrain> {
    MotionExecutor::new(dt, profile, Arc::new(clock.clone())).unwrap()
}

#[test]
fn turn_settles_in_small_window_before_timeout() {
    let clock = ManualClock::new();
    // 30 deg off for 150 ms, then parked 2 deg from the target
    let dt = ScriptedDrivetrain::new(&clock, |_, t| {
        let error = if t < ms(150) { 30.0 } else { 2.0 };
        Ok(MotionSample {
            error,
            progress: 90.0 - error,
        })
    });
    let mut ex = executor(dt, ConfigurationProfile::default(), &clock);

    let h = ex.submit(MotionRequest::turn(90.0, 90.0)).unwrap();
    let out = ex.wait(&h, WaitMode::Blocking).unwrap();

    assert_eq!(out.status, WaitStatus::Settled(SettleReason::SmallError));
    assert_eq!(out.elapsed, ms(230));
    assert!(out.elapsed < ms(500));
    assert!(ex.is_idle());
}

#[test]
fn stalled_drive_is_forced_complete_at_max_time() {
    let clock = ManualClock::new();
    let mut ex = executor(ScriptedDrivetrain::stalled(&clock), ConfigurationProfile::default(), &clock);

    let h = ex.submit(MotionRequest::drive(24.0, 110.0)).unwrap();
    let out = ex.wait(&h, WaitMode::Blocking).unwrap();

    assert_eq!(out.status, WaitStatus::TimedOut);
    assert_eq!(out.elapsed, ms(500));
    assert_eq!(clock.elapsed(), ms(500));
    assert_eq!(out.error, 24.0);
}

#[test]
fn wait_until_returns_on_progress_and_speed_change_hits_same_motion() {
    let clock = ManualClock::new();
    // 60 in/s, so 6 in of progress after 100 ms
    let dt = ScriptedDrivetrain::linear(&clock, 60.0);
    let mut ex = executor(dt, ConfigurationProfile::default(), &clock);

    let h = ex.submit(MotionRequest::drive_slew(24.0, 30.0)).unwrap();
    let out = ex.wait(&h, WaitMode::WaitUntil(6.0)).unwrap();
    assert_eq!(out.status, WaitStatus::ProgressReached);
    assert_eq!(out.elapsed, ms(100));
    assert!(out.error > 1.0, "target is still far away");
    assert_eq!(ex.active_kind(), Some(MotionKind::Drive));

    ex.set_max_speed(&h, 110.0).unwrap();
    assert_eq!(ex.drivetrain().speed_changes(), [110.0]);

    let out = ex.wait(&h, WaitMode::Blocking).unwrap();
    assert_eq!(out.status, WaitStatus::Settled(SettleReason::SmallError));
    // inside 1 in from 390 ms and held for 80 ms; elapsed counts from submission
    assert_eq!(out.elapsed, ms(470));
    assert_eq!(ex.drivetrain().started().len(), 1);
    assert!(ex.is_idle());
}

#[test]
fn negative_wait_until_threshold_waits_for_reverse_progress() {
    let clock = ManualClock::new();
    let mut ex = executor(
        ScriptedDrivetrain::linear(&clock, 24.0),
        ConfigurationProfile::default(),
        &clock,
    );
    let h = ex.submit(MotionRequest::drive(-24.0, 30.0)).unwrap();
    let out = ex.wait(&h, WaitMode::WaitUntil(-6.0)).unwrap();
    assert_eq!(out.status, WaitStatus::ProgressReached);
    assert_eq!(out.elapsed, ms(250));
    assert_eq!(out.progress, -6.0);
    ex.release(h).unwrap();
}

#[test]
fn quick_chain_hands_over_at_chain_threshold() {
    let clock = ManualClock::new();
    // 100 deg/s toward a 43 deg turn: inside 3 deg after about 400 ms,
    // well before the 80 ms small window could settle it
    let mut ex = executor(
        ScriptedDrivetrain::linear(&clock, 100.0),
        ConfigurationProfile::default(),
        &clock,
    );
    let h = ex.submit(MotionRequest::turn(43.0, 90.0)).unwrap();
    let out = ex.wait(&h, WaitMode::QuickChain).unwrap();
    assert_eq!(out.status, WaitStatus::Chained);
    assert!((ms(400)..=ms(410)).contains(&out.elapsed), "{:?}", out.elapsed);
    assert!(ex.is_idle());
}

#[test]
fn interference_recovery_resolves_on_second_attempt() {
    let clock = ManualClock::new();
    // interfered() is read after every blocking drive wait and once more
    // after each settle delay: main drive, then (corrective wait, re-read)
    // per attempt
    let dt = ScriptedDrivetrain::settled(&clock).with_interference([true, false, true, false, false]);
    let ex = executor(dt, ConfigurationProfile::default(), &clock);
    let log = ActuatorLog::new();
    let mut runner = ScriptRunner::new(ex, log.mechanisms(), RecoveryProfile::default());

    let script = RoutineScript::builder("tug")
        .retry_drive(24.0, 110.0, 3)
        .turn(90.0, 90.0)
        .build()
        .unwrap();
    let stats = runner.run(&script).unwrap();

    assert_eq!(stats.interference_resolved, 1);
    assert_eq!(stats.interference_unresolved, 0);
    assert_eq!(runner.policy().state(), PolicyState::Normal);

    let dt = runner.executor().drivetrain();
    assert_eq!(dt.resets(), 2);
    let started: Vec<_> = dt.started().iter().map(|m| (m.kind, m.target, m.max_speed)).collect();
    assert_eq!(
        started,
        [
            (MotionKind::Drive, 24.0, 110.0),
            (MotionKind::Drive, -2.0, 20.0),
            (MotionKind::Drive, -2.0, 20.0),
            (MotionKind::Turn, 90.0, 90.0),
        ]
    );
    // 80 ms settle per motion plus a 1 s pause after each corrective drive;
    // the turn starts right after the second attempt
    assert_eq!(stats.elapsed, ms(80 + 2 * (80 + 1_000) + 80));
}

#[test]
fn unresolved_interference_still_runs_the_next_step() {
    let clock = ManualClock::new();
    let dt = ScriptedDrivetrain::settled(&clock).with_interference([true; 5]);
    let ex = executor(dt, ConfigurationProfile::default(), &clock);
    let mut runner = ScriptRunner::new(ex, ActuatorLog::new().mechanisms(), RecoveryProfile::default());

    let script = RoutineScript::builder("tug")
        .retry_drive(-12.0, 127.0, 3)
        .turn(90.0, 90.0)
        .build()
        .unwrap();
    let stats = runner.run(&script).unwrap();

    assert_eq!(stats.interference_unresolved, 1);
    assert_eq!(runner.policy().state(), PolicyState::Normal);
    let dt = runner.executor().drivetrain();
    assert_eq!(dt.resets(), 2);
    // a stalled reverse drive is corrected by creeping forward
    assert_eq!(dt.started()[1].target, 2.0);
    assert_eq!(dt.started().last().map(|m| m.kind), Some(MotionKind::Turn));
}
