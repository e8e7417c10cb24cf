//! Collaborator interfaces consumed by the sequencing engine.
//!
//! The drivetrain controller and the actuator drivers live outside the engine;
//! this crate only describes what the engine needs from them. Errors cross the
//! boundary boxed so any driver stack can plug in.

pub mod clock;
pub mod motion;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use motion::{ExitConditions, MotionKind, MotionSample, PidGains, PidLoop, SwingSide, Target};

/// Error type used at every trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Closed-loop drivetrain controller.
///
/// The controller runs its own fixed-rate loop. Only one motion is active at a
/// time; starting a new one supersedes the previous target.
pub trait Drivetrain {
    fn set_pid_gains(&mut self, which: PidLoop, gains: PidGains) -> HwResult<()>;
    fn set_exit_conditions(&mut self, kind: MotionKind, exit: ExitConditions) -> HwResult<()>;
    fn set_chain_threshold(&mut self, kind: MotionKind, threshold: f64) -> HwResult<()>;
    fn set_slew(&mut self, distance: f64, max_speed: f64) -> HwResult<()>;
    fn set_heading_scale(&mut self, scale: f64) -> HwResult<()>;

    /// Drive `distance` inches from the current position reference.
    fn start_drive(&mut self, distance: f64, max_speed: f64, slew: bool) -> HwResult<()>;
    fn start_turn(&mut self, heading: Target, max_speed: f64) -> HwResult<()>;
    /// Swing about one side; `still_speed` drives the pivot side for wider arcs.
    fn start_swing(
        &mut self,
        side: SwingSide,
        heading: Target,
        moving_speed: f64,
        still_speed: f64,
    ) -> HwResult<()>;

    /// Change the speed cap of the motion currently in flight.
    fn set_max_speed(&mut self, max_speed: f64) -> HwResult<()>;

    /// Snapshot of the active motion's error and progress.
    fn sample(&mut self) -> HwResult<MotionSample>;

    /// True when the last motion diverged from its expected profile.
    fn interfered(&mut self) -> bool;

    /// Zero the positional reference so the next drive is measured from here.
    fn reset_sensors(&mut self) -> HwResult<()>;
}

/// Binary pneumatic output (clamp, intake lift piston).
pub trait Piston {
    fn set_value(&mut self, extended: bool) -> HwResult<()>;
}

/// Continuous-power roller; `power` in -127..=127, 0 stops.
pub trait Roller {
    fn move_power(&mut self, power: i32) -> HwResult<()>;
}

/// Absolute-position mechanism.
pub trait Lift {
    fn move_absolute(&mut self, position: f64, speed: i32) -> HwResult<()>;
}

impl<T: Drivetrain + ?Sized> Drivetrain for Box<T> {
    fn set_pid_gains(&mut self, which: PidLoop, gains: PidGains) -> HwResult<()> {
        (**self).set_pid_gains(which, gains)
    }
    fn set_exit_conditions(&mut self, kind: MotionKind, exit: ExitConditions) -> HwResult<()> {
        (**self).set_exit_conditions(kind, exit)
    }
    fn set_chain_threshold(&mut self, kind: MotionKind, threshold: f64) -> HwResult<()> {
        (**self).set_chain_threshold(kind, threshold)
    }
    fn set_slew(&mut self, distance: f64, max_speed: f64) -> HwResult<()> {
        (**self).set_slew(distance, max_speed)
    }
    fn set_heading_scale(&mut self, scale: f64) -> HwResult<()> {
        (**self).set_heading_scale(scale)
    }
    fn start_drive(&mut self, distance: f64, max_speed: f64, slew: bool) -> HwResult<()> {
        (**self).start_drive(distance, max_speed, slew)
    }
    fn start_turn(&mut self, heading: Target, max_speed: f64) -> HwResult<()> {
        (**self).start_turn(heading, max_speed)
    }
    fn start_swing(
        &mut self,
        side: SwingSide,
        heading: Target,
        moving_speed: f64,
        still_speed: f64,
    ) -> HwResult<()> {
        (**self).start_swing(side, heading, moving_speed, still_speed)
    }
    fn set_max_speed(&mut self, max_speed: f64) -> HwResult<()> {
        (**self).set_max_speed(max_speed)
    }
    fn sample(&mut self) -> HwResult<MotionSample> {
        (**self).sample()
    }
    fn interfered(&mut self) -> bool {
        (**self).interfered()
    }
    fn reset_sensors(&mut self) -> HwResult<()> {
        (**self).reset_sensors()
    }
}
