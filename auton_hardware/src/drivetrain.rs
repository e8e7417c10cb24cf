//! Kinematic drivetrain simulation.
//!
//! Motion is integrated lazily: whenever the engine touches the drivetrain,
//! the active motion is advanced by the time elapsed on the shared clock since
//! the last touch. With a `ManualClock` the whole routine runs instantly and
//! deterministically; with a `MonotonicClock` it runs in real time.

use std::sync::Arc;
use std::time::Instant;

use auton_traits::{
    Clock, Drivetrain, ExitConditions, HwResult, MotionKind, MotionSample, PidGains, PidLoop,
    SwingSide, Target,
};

use crate::error::HwError;

const MOTOR_MAX: f64 = 127.0;

/// Top speeds at full motor command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveModel {
    /// in/s
    pub linear: f64,
    /// deg/s for a point turn; a swing pivots on one side at half this rate
    pub angular: f64,
}

impl Default for DriveModel {
    fn default() -> Self {
        Self {
            linear: 60.0,
            angular: 360.0,
        }
    }
}

/// Robot position relative to the last sensor reset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pose {
    /// in
    pub position: f64,
    /// deg
    pub heading: f64,
}

/// Settings written by the engine's configuration pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub gains: Vec<(PidLoop, PidGains)>,
    pub exits: Vec<(MotionKind, ExitConditions)>,
    pub chains: Vec<(MotionKind, f64)>,
    pub slew: Option<(f64, f64)>,
    pub heading_scale: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    kind: MotionKind,
    start: f64,
    goal: f64,
    max_speed: f64,
    slew: bool,
    /// Where a blocked drive stops short.
    stall_at: Option<f64>,
}

pub struct SimulatedDrivetrain {
    clock: Arc<dyn Clock + Send + Sync>,
    model: DriveModel,
    pose: Pose,
    active: Option<Active>,
    last_update: Instant,
    blocked_drives: u32,
    interfered: bool,
    applied: Applied,
    motions: u32,
}

impl SimulatedDrivetrain {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last_update = clock.now();
        Self {
            clock,
            model: DriveModel::default(),
            pose: Pose::default(),
            active: None,
            last_update,
            blocked_drives: 0,
            interfered: false,
            applied: Applied::default(),
            motions: 0,
        }
    }

    pub fn with_model(mut self, model: DriveModel) -> Self {
        self.model = model;
        self
    }

    /// The next `drives` drives hit an obstacle halfway, stop there and raise
    /// the interference flag.
    pub fn with_obstacle(mut self, drives: u32) -> Self {
        self.blocked_drives = drives;
        self
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn applied(&self) -> &Applied {
        &self.applied
    }

    /// Motions started since construction.
    pub fn motions(&self) -> u32 {
        self.motions
    }

    fn advance(&mut self) {
        let now = self.clock.now();
        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;
        let Some(active) = self.active else {
            return;
        };

        let slew = self.applied.slew;
        let current = self.value(active.kind);
        let mut cap = active.max_speed;
        if active.slew
            && let Some((distance, slew_speed)) = slew
            && (current - active.start).abs() < distance
        {
            cap = cap.min(slew_speed);
        }
        let rate = match active.kind {
            MotionKind::Drive => self.model.linear,
            MotionKind::Turn => self.model.angular,
            MotionKind::Swing => self.model.angular / 2.0,
        } * cap
            / MOTOR_MAX;

        let stop = active.stall_at.unwrap_or(active.goal);
        let gap = stop - current;
        let reach = rate * dt;
        let next = if reach >= gap.abs() {
            stop
        } else {
            current + reach.copysign(gap)
        };
        match active.kind {
            MotionKind::Drive => self.pose.position = next,
            MotionKind::Turn | MotionKind::Swing => self.pose.heading = next,
        }
        if active.stall_at.is_some_and(|s| next == s) && !self.interfered {
            tracing::debug!(position = next, "simulated drive blocked");
            self.interfered = true;
        }
    }

    fn value(&self, kind: MotionKind) -> f64 {
        match kind {
            MotionKind::Drive => self.pose.position,
            MotionKind::Turn | MotionKind::Swing => self.pose.heading,
        }
    }

    fn heading_goal(&self, heading: Target) -> f64 {
        match heading {
            Target::Absolute(h) => h,
            Target::Relative(d) => self.pose.heading + d,
        }
    }

    fn begin(&mut self, kind: MotionKind, goal: f64, max_speed: f64, slew: bool) -> HwResult<()> {
        if !(max_speed > 0.0 && max_speed <= MOTOR_MAX) {
            return Err(HwError::OutOfRange {
                what: "max speed",
                value: max_speed,
            }
            .into());
        }
        self.advance();
        let start = self.value(kind);
        let stall_at = if kind == MotionKind::Drive && self.blocked_drives > 0 {
            self.blocked_drives -= 1;
            Some(start + (goal - start) / 2.0)
        } else {
            None
        };
        self.interfered = false;
        self.motions += 1;
        self.active = Some(Active {
            kind,
            start,
            goal,
            max_speed,
            slew,
            stall_at,
        });
        tracing::trace!(%kind, start, goal, max_speed, "simulated motion started");
        Ok(())
    }
}

impl Drivetrain for SimulatedDrivetrain {
    fn set_pid_gains(&mut self, which: PidLoop, gains: PidGains) -> HwResult<()> {
        self.applied.gains.push((which, gains));
        Ok(())
    }

    fn set_exit_conditions(&mut self, kind: MotionKind, exit: ExitConditions) -> HwResult<()> {
        self.applied.exits.push((kind, exit));
        Ok(())
    }

    fn set_chain_threshold(&mut self, kind: MotionKind, threshold: f64) -> HwResult<()> {
        self.applied.chains.push((kind, threshold));
        Ok(())
    }

    fn set_slew(&mut self, distance: f64, max_speed: f64) -> HwResult<()> {
        self.applied.slew = Some((distance, max_speed));
        Ok(())
    }

    fn set_heading_scale(&mut self, scale: f64) -> HwResult<()> {
        self.applied.heading_scale = Some(scale);
        Ok(())
    }

    fn start_drive(&mut self, distance: f64, max_speed: f64, slew: bool) -> HwResult<()> {
        self.advance();
        let goal = self.pose.position + distance;
        self.begin(MotionKind::Drive, goal, max_speed, slew)
    }

    fn start_turn(&mut self, heading: Target, max_speed: f64) -> HwResult<()> {
        self.advance();
        let goal = self.heading_goal(heading);
        self.begin(MotionKind::Turn, goal, max_speed, false)
    }

    fn start_swing(
        &mut self,
        _side: SwingSide,
        heading: Target,
        moving_speed: f64,
        _still_speed: f64,
    ) -> HwResult<()> {
        self.advance();
        let goal = self.heading_goal(heading);
        self.begin(MotionKind::Swing, goal, moving_speed, false)
    }

    fn set_max_speed(&mut self, max_speed: f64) -> HwResult<()> {
        if !(max_speed > 0.0 && max_speed <= MOTOR_MAX) {
            return Err(HwError::OutOfRange {
                what: "max speed",
                value: max_speed,
            }
            .into());
        }
        self.advance();
        if let Some(active) = self.active.as_mut() {
            active.max_speed = max_speed;
        }
        Ok(())
    }

    fn sample(&mut self) -> HwResult<MotionSample> {
        self.advance();
        let Some(active) = self.active else {
            return Ok(MotionSample::default());
        };
        let current = self.value(active.kind);
        Ok(MotionSample {
            error: active.goal - current,
            progress: current - active.start,
        })
    }

    fn interfered(&mut self) -> bool {
        self.advance();
        self.interfered
    }

    fn reset_sensors(&mut self) -> HwResult<()> {
        self.advance();
        self.active = None;
        self.pose.position = 0.0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auton_traits::ManualClock;
    use std::time::Duration;

    fn sim(clock: &ManualClock) -> SimulatedDrivetrain {
        SimulatedDrivetrain::new(Arc::new(clock.clone()))
    }

    #[test]
    fn drive_closes_at_capped_speed() {
        let clock = ManualClock::new();
        let mut dt = sim(&clock);
        // 60 in/s at full command, so 30 in/s at half
        dt.start_drive(24.0, 63.5, false).unwrap();
        clock.advance(Duration::from_millis(400));
        let s = dt.sample().unwrap();
        assert!((s.progress - 12.0).abs() < 1e-9);
        assert!((s.error - 12.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(2));
        let s = dt.sample().unwrap();
        assert_eq!(s.error, 0.0);
        assert_eq!(dt.pose().position, 24.0);
    }

    #[test]
    fn relative_turn_is_measured_from_current_heading() {
        let clock = ManualClock::new();
        let mut dt = sim(&clock);
        dt.start_turn(Target::Absolute(90.0), 127.0).unwrap();
        clock.advance(Duration::from_secs(1));
        dt.start_turn(Target::Relative(-30.0), 127.0).unwrap();
        clock.advance(Duration::from_secs(1));
        let s = dt.sample().unwrap();
        assert_eq!(dt.pose().heading, 60.0);
        assert_eq!(s.progress, -30.0);
    }

    #[test]
    fn reset_zeroes_position_only() {
        let clock = ManualClock::new();
        let mut dt = sim(&clock);
        dt.start_turn(Target::Absolute(45.0), 127.0).unwrap();
        clock.advance(Duration::from_secs(1));
        dt.start_drive(10.0, 127.0, false).unwrap();
        clock.advance(Duration::from_secs(1));
        dt.reset_sensors().unwrap();
        assert_eq!(dt.pose(), Pose { position: 0.0, heading: 45.0 });
    }

    #[test]
    fn rejects_out_of_range_speed() {
        let clock = ManualClock::new();
        let mut dt = sim(&clock);
        let err = dt.start_drive(10.0, 200.0, false).unwrap_err();
        assert!(err.downcast_ref::<HwError>().is_some());
        assert_eq!(dt.motions(), 0);
    }
}
