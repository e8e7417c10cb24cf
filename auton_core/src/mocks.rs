//! Test and helper mocks for auton_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use auton_traits::{
    Clock, Drivetrain, ExitConditions, HwResult, Lift, ManualClock, MotionKind, MotionSample,
    Piston, PidGains, PidLoop, Roller, SwingSide, Target,
};

use crate::runner::Mechanisms;

/// What the drivetrain was last asked to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartedMotion {
    pub kind: MotionKind,
    pub target: f64,
    pub max_speed: f64,
    pub slew: bool,
    pub side: Option<SwingSide>,
}

type Trace = Box<dyn FnMut(&StartedMotion, Duration) -> HwResult<MotionSample>>;

/// Drivetrain whose samples come from a closure of (motion, time since start).
///
/// Time is read from a shared `ManualClock`, so the executor's sleeps are
/// what moves the motion along.
pub struct ScriptedDrivetrain {
    clock: ManualClock,
    trace: Trace,
    current: Option<(StartedMotion, Instant)>,
    interference: VecDeque<bool>,
    started: Vec<StartedMotion>,
    gains: Vec<(PidLoop, PidGains)>,
    exits: Vec<(MotionKind, ExitConditions)>,
    chains: Vec<(MotionKind, f64)>,
    speed_changes: Vec<f64>,
    resets: u32,
}

impl ScriptedDrivetrain {
    pub fn new(
        clock: &ManualClock,
        trace: impl FnMut(&StartedMotion, Duration) -> HwResult<MotionSample> + 'static,
    ) -> Self {
        Self {
            clock: clock.clone(),
            trace: Box::new(trace),
            current: None,
            interference: VecDeque::new(),
            started: Vec::new(),
            gains: Vec::new(),
            exits: Vec::new(),
            chains: Vec::new(),
            speed_changes: Vec::new(),
            resets: 0,
        }
    }

    /// Already on target: every sample reports zero error.
    pub fn settled(clock: &ManualClock) -> Self {
        Self::new(clock, |m, _| {
            Ok(MotionSample {
                error: 0.0,
                progress: m.target,
            })
        })
    }

    /// Never moves.
    pub fn stalled(clock: &ManualClock) -> Self {
        Self::new(clock, |m, _| {
            Ok(MotionSample {
                error: m.target,
                progress: 0.0,
            })
        })
    }

    /// Closes the error at `rate` units per second and then holds on target.
    pub fn linear(clock: &ManualClock, rate: f64) -> Self {
        Self::new(clock, move |m, t| {
            let travelled = (rate * t.as_secs_f64()).min(m.target.abs());
            let progress = travelled.copysign(m.target);
            Ok(MotionSample {
                error: m.target - progress,
                progress,
            })
        })
    }

    pub fn failing_sample(clock: &ManualClock) -> Self {
        Self::new(clock, |_, _| Err("left drive encoder unplugged".into()))
    }

    /// Flags returned by successive `interfered()` calls; false once exhausted.
    pub fn with_interference(mut self, flags: impl IntoIterator<Item = bool>) -> Self {
        self.interference = flags.into_iter().collect();
        self
    }

    pub fn started(&self) -> &[StartedMotion] {
        &self.started
    }
    pub fn gains(&self) -> &[(PidLoop, PidGains)] {
        &self.gains
    }
    pub fn exits(&self) -> &[(MotionKind, ExitConditions)] {
        &self.exits
    }
    pub fn chains(&self) -> &[(MotionKind, f64)] {
        &self.chains
    }
    pub fn speed_changes(&self) -> &[f64] {
        &self.speed_changes
    }
    pub fn resets(&self) -> u32 {
        self.resets
    }

    fn begin(&mut self, motion: StartedMotion) {
        self.started.push(motion);
        self.current = Some((motion, self.clock.now()));
    }
}

impl Drivetrain for ScriptedDrivetrain {
    fn set_pid_gains(&mut self, which: PidLoop, gains: PidGains) -> HwResult<()> {
        self.gains.push((which, gains));
        Ok(())
    }
    fn set_exit_conditions(&mut self, kind: MotionKind, exit: ExitConditions) -> HwResult<()> {
        self.exits.push((kind, exit));
        Ok(())
    }
    fn set_chain_threshold(&mut self, kind: MotionKind, threshold: f64) -> HwResult<()> {
        self.chains.push((kind, threshold));
        Ok(())
    }
    fn set_slew(&mut self, _distance: f64, _max_speed: f64) -> HwResult<()> {
        Ok(())
    }
    fn set_heading_scale(&mut self, _scale: f64) -> HwResult<()> {
        Ok(())
    }
    fn start_drive(&mut self, distance: f64, max_speed: f64, slew: bool) -> HwResult<()> {
        self.begin(StartedMotion {
            kind: MotionKind::Drive,
            target: distance,
            max_speed,
            slew,
            side: None,
        });
        Ok(())
    }
    fn start_turn(&mut self, heading: Target, max_speed: f64) -> HwResult<()> {
        self.begin(StartedMotion {
            kind: MotionKind::Turn,
            target: heading.value(),
            max_speed,
            slew: false,
            side: None,
        });
        Ok(())
    }
    fn start_swing(
        &mut self,
        side: SwingSide,
        heading: Target,
        moving_speed: f64,
        _still_speed: f64,
    ) -> HwResult<()> {
        self.begin(StartedMotion {
            kind: MotionKind::Swing,
            target: heading.value(),
            max_speed: moving_speed,
            slew: false,
            side: Some(side),
        });
        Ok(())
    }
    fn set_max_speed(&mut self, max_speed: f64) -> HwResult<()> {
        self.speed_changes.push(max_speed);
        if let Some((m, _)) = self.current.as_mut() {
            m.max_speed = max_speed;
        }
        Ok(())
    }
    fn sample(&mut self) -> HwResult<MotionSample> {
        let Some((motion, since)) = self.current else {
            return Ok(MotionSample::default());
        };
        let t = self.clock.now().saturating_duration_since(since);
        (self.trace)(&motion, t)
    }
    fn interfered(&mut self) -> bool {
        self.interference.pop_front().unwrap_or(false)
    }
    fn reset_sensors(&mut self) -> HwResult<()> {
        self.resets += 1;
        Ok(())
    }
}

// ── Actuators ────────────────────────────────────────────────────────────────

/// Actuator that accepts everything and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActuator;

impl Piston for NoopActuator {
    fn set_value(&mut self, _extended: bool) -> HwResult<()> {
        Ok(())
    }
}

impl Roller for NoopActuator {
    fn move_power(&mut self, _power: i32) -> HwResult<()> {
        Ok(())
    }
}

impl Lift for NoopActuator {
    fn move_absolute(&mut self, _position: f64, _speed: i32) -> HwResult<()> {
        Ok(())
    }
}

/// Shared log of actuator commands, one line per command, e.g. `clamp=true`.
#[derive(Debug, Default, Clone)]
pub struct ActuatorLog {
    entries: Arc<Mutex<Vec<String>>>,
    fail_intake: bool,
}

impl ActuatorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intake roller commands fail instead of being logged.
    pub fn with_failing_intake(mut self) -> Self {
        self.fail_intake = true;
        self
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut g) = self.entries.lock() {
            g.push(line);
        }
    }

    pub fn mechanisms(&self) -> Mechanisms {
        Mechanisms {
            clamp: Box::new(LoggedPiston {
                name: "clamp",
                log: self.clone(),
            }),
            intake_piston: Box::new(LoggedPiston {
                name: "intake_piston",
                log: self.clone(),
            }),
            doinker: Box::new(LoggedPiston {
                name: "doinker",
                log: self.clone(),
            }),
            intake: Box::new(LoggedRoller { log: self.clone() }),
            lift: Box::new(LoggedLift { log: self.clone() }),
        }
    }
}

struct LoggedPiston {
    name: &'static str,
    log: ActuatorLog,
}

impl Piston for LoggedPiston {
    fn set_value(&mut self, extended: bool) -> HwResult<()> {
        self.log.push(format!("{}={extended}", self.name));
        Ok(())
    }
}

struct LoggedRoller {
    log: ActuatorLog,
}

impl Roller for LoggedRoller {
    fn move_power(&mut self, power: i32) -> HwResult<()> {
        if self.log.fail_intake {
            return Err("intake motor over temperature".into());
        }
        self.log.push(format!("intake={power}"));
        Ok(())
    }
}

struct LoggedLift {
    log: ActuatorLog,
}

impl Lift for LoggedLift {
    fn move_absolute(&mut self, position: f64, speed: i32) -> HwResult<()> {
        self.log.push(format!("lift={position}@{speed}"));
        Ok(())
    }
}
