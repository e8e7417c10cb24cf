//! Routine scripts: an ordered, immutable list of steps, checked once at
//! build time so a malformed routine never reaches the field.

use std::fmt;
use std::time::Duration;

use auton_traits::{MotionKind, SwingSide};

use crate::error::{ScriptError, ScriptFault};
use crate::motion::{MotionRequest, WaitMode};
use crate::util::speed_in_range;

/// Lift presets (encoder degrees).
pub mod lift {
    pub const LOAD: f64 = 475.0;
    pub const SCORE: f64 = 1875.0;
    pub const DOWN: f64 = 0.0;
    pub const LADDER: f64 = 700.0;
    pub const SPEED: i32 = 127;
}

/// Intake roller presets.
pub mod intake {
    pub const ON: i32 = 127;
    pub const REVERSE: i32 = -127;
    pub const OFF: i32 = 0;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    /// Mobile-goal clamp piston.
    Clamp,
    /// Piston raising and lowering the intake.
    IntakePiston,
    /// Arm piston that sweeps rings out of a corner.
    Doinker,
    /// Intake roller.
    Intake,
    Lift,
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Actuator::Clamp => "clamp",
            Actuator::IntakePiston => "intake piston",
            Actuator::Doinker => "doinker",
            Actuator::Intake => "intake",
            Actuator::Lift => "lift",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    Set(bool),
    Power(i32),
    MoveAbsolute { position: f64, speed: i32 },
}

impl ActuatorCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ActuatorCommand::Set(_) => "set",
            ActuatorCommand::Power(_) => "power",
            ActuatorCommand::MoveAbsolute { .. } => "move_absolute",
        }
    }
}

/// Check that `command` fits `actuator` and its values are in range.
pub fn check_actuator(actuator: Actuator, command: ActuatorCommand) -> Result<(), ScriptFault> {
    match (actuator, command) {
        (Actuator::Clamp | Actuator::IntakePiston | Actuator::Doinker, ActuatorCommand::Set(_)) => {
            Ok(())
        }
        (Actuator::Intake, ActuatorCommand::Power(p)) => {
            if (-127..=127).contains(&p) {
                Ok(())
            } else {
                Err(ScriptFault::PowerOutOfRange(p))
            }
        }
        (Actuator::Lift, ActuatorCommand::MoveAbsolute { position, speed }) => {
            if !position.is_finite() {
                Err(ScriptFault::LiftPosition)
            } else if !(1..=127).contains(&speed) {
                Err(ScriptFault::LiftSpeedOutOfRange(speed))
            } else {
                Ok(())
            }
        }
        (actuator, command) => Err(ScriptFault::UnsupportedCommand {
            actuator,
            command: command.name(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Submit and wait.
    Motion(MotionRequest, WaitMode),
    /// Submit and leave the motion in flight while later steps run.
    Launch(MotionRequest),
    /// Wait on the motion in flight.
    Await(WaitMode),
    /// Change the speed cap of the motion in flight.
    SetMaxSpeed(f64),
    /// Stop tracking the motion in flight; the next motion supersedes it.
    Release,
    Actuator(Actuator, ActuatorCommand),
    Delay(Duration),
    /// Drive, and run the recovery policy if it reports interference.
    Retry {
        request: MotionRequest,
        max_attempts: u32,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Motion(req, mode) => write!(f, "{req}, wait {}", mode_label(*mode)),
            Step::Launch(req) => write!(f, "launch {req}"),
            Step::Await(mode) => write!(f, "wait {}", mode_label(*mode)),
            Step::SetMaxSpeed(s) => write!(f, "set max speed {s}"),
            Step::Release => f.write_str("release"),
            Step::Actuator(a, ActuatorCommand::Set(v)) => write!(f, "{a} {v}"),
            Step::Actuator(a, ActuatorCommand::Power(p)) => write!(f, "{a} power {p}"),
            Step::Actuator(a, ActuatorCommand::MoveAbsolute { position, speed }) => {
                write!(f, "{a} to {position} @ {speed}")
            }
            Step::Delay(d) => write!(f, "delay {} ms", d.as_millis()),
            Step::Retry {
                request,
                max_attempts,
            } => write!(f, "{request}, retry up to {max_attempts}"),
        }
    }
}

fn mode_label(mode: WaitMode) -> String {
    match mode {
        WaitMode::Blocking => "blocking".into(),
        WaitMode::QuickChain => "quick-chain".into(),
        WaitMode::WaitUntil(p) => format!("until {p}"),
    }
}

/// A named, validated routine.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineScript {
    name: String,
    steps: Vec<Step>,
}

impl RoutineScript {
    pub fn builder(name: impl Into<String>) -> ScriptBuilder {
        ScriptBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Validate a raw step list and wrap it.
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Result<Self, ScriptError> {
        let name = name.into();
        validate(&name, &steps)?;
        Ok(Self { name, steps })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

fn validate(name: &str, steps: &[Step]) -> Result<(), ScriptError> {
    let fail = |step: usize, fault: ScriptFault| ScriptError {
        routine: name.to_owned(),
        step,
        fault,
    };

    let mut in_flight = false;
    let mut open_chain: Option<usize> = None;
    let mut after_wait = |i: usize, mode: WaitMode, in_flight: &mut bool| -> Result<(), ScriptFault> {
        match mode {
            WaitMode::Blocking => {
                *in_flight = false;
                open_chain = None;
            }
            WaitMode::QuickChain => {
                *in_flight = false;
                open_chain = Some(i);
            }
            WaitMode::WaitUntil(p) => {
                if !p.is_finite() {
                    return Err(ScriptFault::ProgressThreshold);
                }
                *in_flight = true;
            }
        }
        Ok(())
    };

    for (i, step) in steps.iter().enumerate() {
        let checked = match step {
            Step::Motion(req, mode) => {
                if in_flight {
                    Err(ScriptFault::MotionInFlight)
                } else {
                    req.validate()
                        .map_err(ScriptFault::InvalidRequest)
                        .and_then(|()| after_wait(i, *mode, &mut in_flight))
                }
            }
            Step::Launch(req) => {
                if in_flight {
                    Err(ScriptFault::MotionInFlight)
                } else {
                    in_flight = true;
                    req.validate().map_err(ScriptFault::InvalidRequest)
                }
            }
            Step::Await(mode) => {
                if in_flight {
                    after_wait(i, *mode, &mut in_flight)
                } else {
                    Err(ScriptFault::NothingInFlight)
                }
            }
            Step::SetMaxSpeed(speed) => {
                if !in_flight {
                    Err(ScriptFault::NothingInFlight)
                } else if !speed_in_range(*speed) {
                    Err(ScriptFault::SpeedOutOfRange(*speed))
                } else {
                    Ok(())
                }
            }
            Step::Release => {
                if in_flight {
                    in_flight = false;
                    Ok(())
                } else {
                    Err(ScriptFault::NothingInFlight)
                }
            }
            Step::Actuator(actuator, command) => check_actuator(*actuator, *command),
            Step::Delay(_) => Ok(()),
            Step::Retry {
                request,
                max_attempts,
            } => {
                if in_flight {
                    Err(ScriptFault::MotionInFlight)
                } else if request.kind() != MotionKind::Drive {
                    Err(ScriptFault::RetryNotDrive)
                } else if *max_attempts == 0 {
                    Err(ScriptFault::ZeroAttempts)
                } else {
                    request
                        .validate()
                        .map_err(ScriptFault::InvalidRequest)
                        .and_then(|()| after_wait(i, WaitMode::Blocking, &mut in_flight))
                }
            }
        };
        checked.map_err(|fault| fail(i, fault))?;
    }

    if let Some(i) = open_chain {
        return Err(fail(i, ScriptFault::UnterminatedChain));
    }
    Ok(())
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// Fluent builder with the robot's speed and actuator presets.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    name: String,
    steps: Vec<Step>,
}

impl ScriptBuilder {
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn motion(self, request: MotionRequest, mode: WaitMode) -> Self {
        self.step(Step::Motion(request, mode))
    }

    // motions that wait until settled

    pub fn drive(self, distance: f64, speed: f64) -> Self {
        self.motion(MotionRequest::drive(distance, speed), WaitMode::Blocking)
    }

    pub fn drive_slew(self, distance: f64, speed: f64) -> Self {
        self.motion(MotionRequest::drive_slew(distance, speed), WaitMode::Blocking)
    }

    pub fn turn(self, heading: f64, speed: f64) -> Self {
        self.motion(MotionRequest::turn(heading, speed), WaitMode::Blocking)
    }

    pub fn turn_relative(self, delta: f64, speed: f64) -> Self {
        self.motion(MotionRequest::turn_relative(delta, speed), WaitMode::Blocking)
    }

    pub fn swing(self, side: SwingSide, heading: f64, speed: f64, still_speed: f64) -> Self {
        self.motion(
            MotionRequest::swing(side, heading, speed, still_speed),
            WaitMode::Blocking,
        )
    }

    // overlapping motions

    pub fn launch(self, request: MotionRequest) -> Self {
        self.step(Step::Launch(request))
    }

    pub fn wait(self, mode: WaitMode) -> Self {
        self.step(Step::Await(mode))
    }

    pub fn wait_until(self, progress: f64) -> Self {
        self.wait(WaitMode::WaitUntil(progress))
    }

    pub fn set_max_speed(self, speed: f64) -> Self {
        self.step(Step::SetMaxSpeed(speed))
    }

    pub fn release(self) -> Self {
        self.step(Step::Release)
    }

    pub fn delay_ms(self, ms: u64) -> Self {
        self.step(Step::Delay(Duration::from_millis(ms)))
    }

    pub fn retry(self, request: MotionRequest, max_attempts: u32) -> Self {
        self.step(Step::Retry {
            request,
            max_attempts,
        })
    }

    pub fn retry_drive(self, distance: f64, speed: f64, max_attempts: u32) -> Self {
        self.retry(MotionRequest::drive(distance, speed), max_attempts)
    }

    // actuators

    pub fn actuator(self, actuator: Actuator, command: ActuatorCommand) -> Self {
        self.step(Step::Actuator(actuator, command))
    }

    pub fn clamp(self) -> Self {
        self.actuator(Actuator::Clamp, ActuatorCommand::Set(true))
    }

    pub fn unclamp(self) -> Self {
        self.actuator(Actuator::Clamp, ActuatorCommand::Set(false))
    }

    pub fn intake_down(self) -> Self {
        self.actuator(Actuator::IntakePiston, ActuatorCommand::Set(true))
    }

    pub fn intake_up(self) -> Self {
        self.actuator(Actuator::IntakePiston, ActuatorCommand::Set(false))
    }

    pub fn doinker_down(self) -> Self {
        self.actuator(Actuator::Doinker, ActuatorCommand::Set(true))
    }

    pub fn doinker_up(self) -> Self {
        self.actuator(Actuator::Doinker, ActuatorCommand::Set(false))
    }

    pub fn intake_power(self, power: i32) -> Self {
        self.actuator(Actuator::Intake, ActuatorCommand::Power(power))
    }

    pub fn intake_on(self) -> Self {
        self.intake_power(intake::ON)
    }

    pub fn intake_reverse(self) -> Self {
        self.intake_power(intake::REVERSE)
    }

    pub fn intake_off(self) -> Self {
        self.intake_power(intake::OFF)
    }

    pub fn lift_to(self, position: f64, speed: i32) -> Self {
        self.actuator(Actuator::Lift, ActuatorCommand::MoveAbsolute { position, speed })
    }

    pub fn lift_load(self) -> Self {
        self.lift_to(lift::LOAD, lift::SPEED)
    }

    pub fn lift_down(self) -> Self {
        self.lift_to(lift::DOWN, lift::SPEED)
    }

    pub fn lift_ladder(self) -> Self {
        self.lift_to(lift::LADDER, lift::SPEED)
    }

    /// Back the ring off the intake, then raise the lift to score.
    pub fn lift_score(self) -> Self {
        self.intake_power(-20)
            .delay_ms(200)
            .intake_off()
            .lift_to(lift::SCORE, lift::SPEED)
    }

    pub fn build(self) -> Result<RoutineScript, ScriptError> {
        RoutineScript::new(self.name, self.steps)
    }
}
