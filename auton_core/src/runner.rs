//! Runs a `RoutineScript` step by step on the calling thread.
//!
//! A routine must keep moving for the whole autonomous period, so field
//! conditions never abort it: timeouts and interference are logged, actuator
//! faults are logged and skipped, drivetrain faults are logged and counted.
//! Only usage and configuration errors stop a run.

use std::time::Duration;

use auton_traits::{Drivetrain, Lift, Piston, Roller};

use crate::config::RecoveryProfile;
use crate::error::{AutonError, Result, UsageError};
use crate::executor::{MotionExecutor, MotionHandle};
use crate::hw_error::map_hw_error;
use crate::motion::{MotionRequest, WaitMode, WaitOutcome, WaitStatus};
use crate::recovery::{InterferenceRecoveryPolicy, RecoveryOutcome};
use crate::script::{Actuator, ActuatorCommand, RoutineScript, Step};
use crate::util::ms;

/// The robot's discrete mechanisms.
pub struct Mechanisms {
    pub clamp: Box<dyn Piston>,
    pub intake_piston: Box<dyn Piston>,
    pub doinker: Box<dyn Piston>,
    pub intake: Box<dyn Roller>,
    pub lift: Box<dyn Lift>,
}

impl Mechanisms {
    /// Mechanisms that accept every command and do nothing.
    pub fn noop() -> Self {
        use crate::mocks::NoopActuator;
        Self {
            clamp: Box::new(NoopActuator),
            intake_piston: Box::new(NoopActuator),
            doinker: Box::new(NoopActuator),
            intake: Box::new(NoopActuator),
            lift: Box::new(NoopActuator),
        }
    }

    fn dispatch(&mut self, actuator: Actuator, command: ActuatorCommand) -> Result<()> {
        let res = match (actuator, command) {
            (Actuator::Clamp, ActuatorCommand::Set(v)) => self.clamp.set_value(v),
            (Actuator::IntakePiston, ActuatorCommand::Set(v)) => self.intake_piston.set_value(v),
            (Actuator::Doinker, ActuatorCommand::Set(v)) => self.doinker.set_value(v),
            (Actuator::Intake, ActuatorCommand::Power(p)) => self.intake.move_power(p),
            (Actuator::Lift, ActuatorCommand::MoveAbsolute { position, speed }) => {
                self.lift.move_absolute(position, speed)
            }
            (actuator, command) => {
                return Err(AutonError::from(UsageError::UnsupportedCommand {
                    actuator,
                    command: command.name(),
                })
                .into());
            }
        };
        res.map_err(|e| map_hw_error(e.as_ref()).into())
    }
}

/// Telemetry of one run. Counts describe what happened; none of them make
/// the run a failure.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub steps: usize,
    pub settled: usize,
    pub chained: usize,
    pub progress_reached: usize,
    pub timed_out: usize,
    pub interference_resolved: usize,
    pub interference_unresolved: usize,
    pub actuator_faults: usize,
    pub hardware_faults: usize,
    pub elapsed: Duration,
}

impl RunStats {
    fn record(&mut self, outcome: &WaitOutcome) {
        match outcome.status {
            WaitStatus::Settled(_) => self.settled += 1,
            WaitStatus::Chained => self.chained += 1,
            WaitStatus::ProgressReached => self.progress_reached += 1,
            WaitStatus::TimedOut => self.timed_out += 1,
        }
    }
}

pub struct ScriptRunner<D: Drivetrain> {
    executor: MotionExecutor<D>,
    mechanisms: Mechanisms,
    policy: InterferenceRecoveryPolicy,
}

impl<D: Drivetrain> ScriptRunner<D> {
    pub fn new(executor: MotionExecutor<D>, mechanisms: Mechanisms, recovery: RecoveryProfile) -> Self {
        Self {
            executor,
            mechanisms,
            policy: InterferenceRecoveryPolicy::new(recovery),
        }
    }

    pub fn executor(&self) -> &MotionExecutor<D> {
        &self.executor
    }

    pub fn policy(&self) -> &InterferenceRecoveryPolicy {
        &self.policy
    }

    pub fn into_executor(self) -> MotionExecutor<D> {
        self.executor
    }

    /// Execute every step in order.
    pub fn run(&mut self, script: &RoutineScript) -> Result<RunStats> {
        let span = tracing::info_span!("routine", name = script.name());
        let _enter = span.enter();

        let started = self.executor.clock().now();
        let mut stats = RunStats::default();
        let mut in_flight: Option<MotionHandle> = None;
        tracing::info!(steps = script.steps().len(), "routine start");

        for (index, step) in script.steps().iter().enumerate() {
            stats.steps += 1;
            tracing::debug!(index, step = %step, "step");
            if let Err(e) = self.run_step(step, &mut in_flight, &mut stats) {
                let hardware =
                    matches!(e.downcast_ref::<AutonError>(), Some(err) if err.is_hardware());
                if !hardware {
                    return Err(e.wrap_err(format!(
                        "routine '{}' step {index} ({step})",
                        script.name()
                    )));
                }
                stats.hardware_faults += 1;
                tracing::error!(index, step = %step, error = %e, "step failed; continuing");
                // a faulted wait drops the motion
                if self.executor.is_idle() {
                    in_flight = None;
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            tracing::debug!("releasing motion still in flight at routine end");
            self.executor.release(handle)?;
        }

        stats.elapsed = self
            .executor
            .clock()
            .now()
            .saturating_duration_since(started);
        tracing::info!(
            elapsed_ms = ms(stats.elapsed),
            settled = stats.settled,
            chained = stats.chained,
            timed_out = stats.timed_out,
            interference_resolved = stats.interference_resolved,
            interference_unresolved = stats.interference_unresolved,
            actuator_faults = stats.actuator_faults,
            hardware_faults = stats.hardware_faults,
            "routine complete"
        );
        Ok(stats)
    }

    fn run_step(
        &mut self,
        step: &Step,
        in_flight: &mut Option<MotionHandle>,
        stats: &mut RunStats,
    ) -> Result<()> {
        match step {
            Step::Motion(request, mode) => {
                let handle = self.executor.submit(*request)?;
                self.finish_wait(handle, *mode, in_flight, stats)?;
            }
            Step::Launch(request) => {
                *in_flight = Some(self.executor.submit(*request)?);
            }
            Step::Await(mode) => {
                let Some(handle) = in_flight.take() else {
                    tracing::warn!("no motion in flight to wait on; skipping");
                    return Ok(());
                };
                self.finish_wait(handle, *mode, in_flight, stats)?;
            }
            Step::SetMaxSpeed(speed) => match in_flight.as_ref() {
                Some(handle) => self.executor.set_max_speed(handle, *speed)?,
                None => tracing::warn!("no motion in flight to speed up; skipping"),
            },
            Step::Release => {
                if let Some(handle) = in_flight.take() {
                    self.executor.release(handle)?;
                }
            }
            Step::Actuator(actuator, command) => {
                if let Err(e) = self.mechanisms.dispatch(*actuator, *command) {
                    if !matches!(e.downcast_ref::<AutonError>(), Some(err) if err.is_hardware()) {
                        return Err(e);
                    }
                    stats.actuator_faults += 1;
                    tracing::warn!(%actuator, error = %e, "actuator command failed; skipping");
                }
            }
            Step::Delay(d) => {
                tracing::debug!(delay_ms = ms(*d), "delay");
                self.executor.clock().sleep(*d);
            }
            Step::Retry {
                request,
                max_attempts,
            } => self.run_retry(request, *max_attempts, stats)?,
        }
        Ok(())
    }

    fn finish_wait(
        &mut self,
        handle: MotionHandle,
        mode: WaitMode,
        in_flight: &mut Option<MotionHandle>,
        stats: &mut RunStats,
    ) -> Result<()> {
        let outcome = self.executor.wait(&handle, mode)?;
        stats.record(&outcome);
        if outcome.interfered {
            tracing::warn!(
                elapsed_ms = ms(outcome.elapsed),
                "drive reported interference; continuing"
            );
        }
        if matches!(mode, WaitMode::WaitUntil(_)) {
            *in_flight = Some(handle);
        }
        Ok(())
    }

    fn run_retry(
        &mut self,
        request: &MotionRequest,
        max_attempts: u32,
        stats: &mut RunStats,
    ) -> Result<()> {
        let handle = self.executor.submit(*request)?;
        let outcome = self.executor.wait(&handle, WaitMode::Blocking)?;
        stats.record(&outcome);
        if !outcome.interfered {
            return Ok(());
        }

        tracing::warn!(
            motion = %request,
            max_attempts,
            "drive reported interference; recovering"
        );
        match self
            .policy
            .recover(&mut self.executor, request.target(), max_attempts)?
        {
            RecoveryOutcome::Resolved { .. } => stats.interference_resolved += 1,
            RecoveryOutcome::Unresolved { .. } => stats.interference_unresolved += 1,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationProfile;
    use crate::mocks::{ActuatorLog, ScriptedDrivetrain};
    use auton_traits::ManualClock;
    use std::sync::Arc;

    fn runner(dt: ScriptedDrivetrain, clock: &ManualClock, log: &ActuatorLog) -> ScriptRunner<ScriptedDrivetrain> {
        let ex = MotionExecutor::new(dt, ConfigurationProfile::default(), Arc::new(clock.clone()))
            .unwrap();
        ScriptRunner::new(ex, log.mechanisms(), RecoveryProfile::default())
    }

    #[test]
    fn actuator_fault_is_skipped() {
        let clock = ManualClock::new();
        let log = ActuatorLog::new().with_failing_intake();
        let mut r = runner(ScriptedDrivetrain::settled(&clock), &clock, &log);
        let script = RoutineScript::builder("faulty intake")
            .clamp()
            .intake_on()
            .lift_ladder()
            .build()
            .unwrap();
        let stats = r.run(&script).unwrap();
        assert_eq!(stats.actuator_faults, 1);
        assert_eq!(log.entries(), ["clamp=true", "lift=700@127"]);
    }

    #[test]
    fn launched_motion_is_released_at_end() {
        let clock = ManualClock::new();
        let log = ActuatorLog::new();
        let mut r = runner(ScriptedDrivetrain::stalled(&clock), &clock, &log);
        let script = RoutineScript::builder("open end")
            .launch(MotionRequest::drive(-26.0, 110.0))
            .build()
            .unwrap();
        r.run(&script).unwrap();
        assert!(r.executor().is_idle());
    }

    #[test]
    fn delays_advance_the_clock() {
        let clock = ManualClock::new();
        let log = ActuatorLog::new();
        let mut r = runner(ScriptedDrivetrain::settled(&clock), &clock, &log);
        let script = RoutineScript::builder("pause")
            .delay_ms(300)
            .delay_ms(200)
            .build()
            .unwrap();
        let stats = r.run(&script).unwrap();
        assert_eq!(stats.elapsed, Duration::from_millis(500));
        assert_eq!(stats.steps, 2);
    }
}
