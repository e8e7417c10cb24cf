//! Config mapping, simulated robot assembly and routine execution.

use std::sync::Arc;

use auton_core::routines::{self, RoutineParams};
use auton_core::{
    AutonError, ConfigurationProfile, Mechanisms, MotionExecutor, RecoveryProfile, RoutineScript,
    RunStats, ScriptRunner,
};
use auton_hardware::{Pose, SimulatedDrivetrain, SimulatedLift, SimulatedPiston, SimulatedRoller};
use auton_traits::{Clock, ManualClock, MonotonicClock};
use serde_json::json;

/// Everything derived from the config file that a run needs.
pub struct Tuning {
    pub profile: ConfigurationProfile,
    pub params: RoutineParams,
    pub recovery: RecoveryProfile,
}

impl Tuning {
    pub fn from_config(cfg: &auton_config::Config) -> eyre::Result<Self> {
        Ok(Self {
            profile: ConfigurationProfile::try_from(cfg).map_err(AutonError::from)?,
            params: cfg.into(),
            recovery: (&cfg.recovery).into(),
        })
    }
}

pub struct RunReport {
    pub routine: String,
    pub stats: RunStats,
    pub pose: Pose,
}

impl RunReport {
    pub fn to_json(&self) -> serde_json::Value {
        let s = &self.stats;
        json!({
            "routine": self.routine,
            "elapsed_ms": u64::try_from(s.elapsed.as_millis()).unwrap_or(u64::MAX),
            "steps": s.steps,
            "settled": s.settled,
            "chained": s.chained,
            "progress_reached": s.progress_reached,
            "timed_out": s.timed_out,
            "interference_resolved": s.interference_resolved,
            "interference_unresolved": s.interference_unresolved,
            "actuator_faults": s.actuator_faults,
            "hardware_faults": s.hardware_faults,
            "pose": { "position_in": self.pose.position, "heading_deg": self.pose.heading },
        })
    }

    pub fn to_text(&self) -> String {
        let s = &self.stats;
        format!(
            "Routine {} complete in {:.2} s: {} steps, {} settled, {} chained, {} timed out, \
             interference {} resolved / {} unresolved, {} actuator faults, {} hardware faults. \
             Final heading {:.1} deg.",
            self.routine,
            s.elapsed.as_secs_f64(),
            s.steps,
            s.settled,
            s.chained,
            s.timed_out,
            s.interference_resolved,
            s.interference_unresolved,
            s.actuator_faults,
            s.hardware_faults,
            self.pose.heading,
        )
    }
}

fn simulated_mechanisms() -> Mechanisms {
    Mechanisms {
        clamp: Box::new(SimulatedPiston::new("clamp")),
        intake_piston: Box::new(SimulatedPiston::new("intake_piston")),
        doinker: Box::new(SimulatedPiston::new("doinker")),
        intake: Box::new(SimulatedRoller::new("intake")),
        lift: Box::new(SimulatedLift::new()),
    }
}

/// Build `script` into a runner on the simulated robot and play it.
pub fn run_script(
    tuning: &Tuning,
    script: &RoutineScript,
    realtime: bool,
    obstacle: u32,
) -> eyre::Result<RunReport> {
    let clock: Arc<dyn Clock + Send + Sync> = if realtime {
        Arc::new(MonotonicClock::new())
    } else {
        Arc::new(ManualClock::new())
    };
    let drivetrain = SimulatedDrivetrain::new(clock.clone()).with_obstacle(obstacle);
    let executor = MotionExecutor::new(drivetrain, tuning.profile.clone(), clock)?;
    let mut runner = ScriptRunner::new(executor, simulated_mechanisms(), tuning.recovery);

    tracing::info!(routine = script.name(), realtime, obstacle, "run start");
    let stats = runner.run(script)?;
    let pose = runner.executor().drivetrain().pose();
    Ok(RunReport {
        routine: script.name().to_owned(),
        stats,
        pose,
    })
}

pub fn run_named(
    tuning: &Tuning,
    name: &str,
    realtime: bool,
    obstacle: u32,
) -> eyre::Result<RunReport> {
    let script = routines::by_name(name, &tuning.params)?;
    run_script(tuning, &script, realtime, obstacle)
}

/// Build every catalog routine; returns how many were checked.
pub fn check_all(tuning: &Tuning) -> eyre::Result<usize> {
    for info in routines::catalog() {
        info.build(&tuning.params).map_err(AutonError::from)?;
    }
    Ok(routines::catalog().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> Tuning {
        Tuning::from_config(&auton_config::Config::default()).unwrap()
    }

    #[test]
    fn every_routine_runs_on_the_simulated_robot() {
        let t = tuning();
        for info in routines::catalog() {
            let report = run_named(&t, info.name, false, 0).unwrap();
            assert_eq!(report.stats.hardware_faults, 0, "{}", info.name);
            assert_eq!(report.stats.actuator_faults, 0, "{}", info.name);
        }
    }

    #[test]
    fn obstacle_triggers_recovery_in_the_interference_example() {
        let report = run_named(&tuning(), "interfered_example", false, 2).unwrap();
        // main drive and the first corrective drive are blocked; the second clears
        assert_eq!(report.stats.interference_resolved, 1);
        assert_eq!(report.stats.interference_unresolved, 0);
    }

    #[test]
    fn report_json_carries_counts() {
        let report = run_named(&tuning(), "turn_example", false, 0).unwrap();
        let v = report.to_json();
        assert_eq!(v["routine"], "turn_example");
        assert_eq!(v["settled"], 3);
        assert_eq!(v["pose"]["heading_deg"].as_f64(), Some(0.0));
    }
}
