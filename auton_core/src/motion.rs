//! Motion requests and wait outcomes.

use std::fmt;
use std::time::Duration;

use auton_traits::{MotionKind, SwingSide, Target};

use crate::util::{MOTOR_MAX, speed_in_range};

/// Shape of a motion; carries the kind-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Relative drive in inches; negative drives backwards.
    Drive { distance: f64, slew: bool },
    Turn { heading: Target },
    /// Swing about one side; `still_speed` drives the pivot side.
    Swing {
        side: SwingSide,
        heading: Target,
        still_speed: f64,
    },
}

/// One closed-loop motion command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRequest {
    pub motion: Motion,
    /// Speed cap on the 0..=127 scale.
    pub max_speed: f64,
}

impl MotionRequest {
    pub const fn drive(distance: f64, max_speed: f64) -> Self {
        Self {
            motion: Motion::Drive {
                distance,
                slew: false,
            },
            max_speed,
        }
    }

    /// Drive with the speed cap over the first few inches.
    pub const fn drive_slew(distance: f64, max_speed: f64) -> Self {
        Self {
            motion: Motion::Drive {
                distance,
                slew: true,
            },
            max_speed,
        }
    }

    pub const fn turn(heading: f64, max_speed: f64) -> Self {
        Self {
            motion: Motion::Turn {
                heading: Target::Absolute(heading),
            },
            max_speed,
        }
    }

    pub const fn turn_relative(delta: f64, max_speed: f64) -> Self {
        Self {
            motion: Motion::Turn {
                heading: Target::Relative(delta),
            },
            max_speed,
        }
    }

    pub const fn swing(side: SwingSide, heading: f64, max_speed: f64, still_speed: f64) -> Self {
        Self {
            motion: Motion::Swing {
                side,
                heading: Target::Absolute(heading),
                still_speed,
            },
            max_speed,
        }
    }

    pub const fn swing_relative(
        side: SwingSide,
        delta: f64,
        max_speed: f64,
        still_speed: f64,
    ) -> Self {
        Self {
            motion: Motion::Swing {
                side,
                heading: Target::Relative(delta),
                still_speed,
            },
            max_speed,
        }
    }

    pub fn kind(&self) -> MotionKind {
        match self.motion {
            Motion::Drive { .. } => MotionKind::Drive,
            Motion::Turn { .. } => MotionKind::Turn,
            Motion::Swing { .. } => MotionKind::Swing,
        }
    }

    /// Distance (in) or heading (deg) the request asks for.
    pub fn target(&self) -> f64 {
        match self.motion {
            Motion::Drive { distance, .. } => distance,
            Motion::Turn { heading } | Motion::Swing { heading, .. } => heading.value(),
        }
    }

    /// Pivot-side speed of a swing; zero for other kinds.
    pub fn secondary_speed(&self) -> f64 {
        match self.motion {
            Motion::Swing { still_speed, .. } => still_speed,
            _ => 0.0,
        }
    }

    pub fn slew(&self) -> bool {
        matches!(self.motion, Motion::Drive { slew: true, .. })
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.target().is_finite() {
            return Err("target must be finite");
        }
        if !speed_in_range(self.max_speed) {
            return Err("max_speed must be in (0, 127]");
        }
        let still = self.secondary_speed();
        if !(still.is_finite() && still.abs() <= MOTOR_MAX) {
            return Err("swing secondary speed must be in [-127, 127]");
        }
        Ok(())
    }
}

impl fmt::Display for MotionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self.motion {
            Motion::Drive { distance, slew } => {
                write!(f, "drive {distance} in @ {}", self.max_speed)?;
                if slew {
                    f.write_str(" (slew)")?;
                }
                Ok(())
            }
            Motion::Turn { heading } | Motion::Swing { heading, .. } => {
                let rel = if matches!(heading, Target::Relative(_)) {
                    " relative"
                } else {
                    ""
                };
                write!(f, "{kind}{rel} {} deg @ {}", heading.value(), self.max_speed)?;
                if let Motion::Swing {
                    side, still_speed, ..
                } = self.motion
                {
                    write!(f, " ({side:?} side, pivot {still_speed})")?;
                }
                Ok(())
            }
        }
    }
}

// ── Waiting ──────────────────────────────────────────────────────────────────

/// How a caller waits on an outstanding motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitMode {
    /// Until a settle window holds or the hard timeout elapses.
    Blocking,
    /// Until the error is within the chain threshold, so the next motion can
    /// take over with momentum.
    QuickChain,
    /// Until signed progress crosses the threshold. The motion stays
    /// outstanding afterwards.
    WaitUntil(f64),
}

/// Which settle window completed the motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    SmallError,
    BigError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    Settled(SettleReason),
    /// Chain threshold reached (`QuickChain`).
    Chained,
    /// Progress threshold crossed (`WaitUntil`).
    ProgressReached,
    /// Hard timeout; the routine carries on regardless.
    TimedOut,
}

impl WaitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WaitStatus::Settled(SettleReason::SmallError) => "settled_small",
            WaitStatus::Settled(SettleReason::BigError) => "settled_big",
            WaitStatus::Chained => "chained",
            WaitStatus::ProgressReached => "progress_reached",
            WaitStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOutcome {
    pub kind: MotionKind,
    pub status: WaitStatus,
    /// Time since the motion was submitted.
    pub elapsed: Duration,
    /// Last observed signed error.
    pub error: f64,
    /// Last observed signed progress.
    pub progress: f64,
    /// Interference flag; only read for drive motions after `Blocking` or
    /// `WaitUntil` waits.
    pub interfered: bool,
}
