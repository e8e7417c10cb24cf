//! Plain data exchanged with the drivetrain controller.

use std::fmt;
use std::time::Duration;

/// The three closed-loop motion families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionKind {
    Drive,
    Turn,
    Swing,
}

impl MotionKind {
    pub const ALL: [MotionKind; 3] = [MotionKind::Drive, MotionKind::Turn, MotionKind::Swing];

    /// Unit of error and progress for this kind.
    pub fn unit(self) -> &'static str {
        match self {
            MotionKind::Drive => "in",
            MotionKind::Turn | MotionKind::Swing => "deg",
        }
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MotionKind::Drive => "drive",
            MotionKind::Turn => "turn",
            MotionKind::Swing => "swing",
        };
        f.write_str(s)
    }
}

/// Individual PID loops inside the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidLoop {
    Heading,
    Drive,
    Turn,
    Swing,
}

/// Which side of the drivetrain moves during a swing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingSide {
    Left,
    Right,
}

/// Heading target, either absolute or relative to the current heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    Absolute(f64),
    Relative(f64),
}

impl Target {
    pub fn value(self) -> f64 {
        match self {
            Target::Absolute(v) | Target::Relative(v) => v,
        }
    }
}

/// PID gains; `start_i` limits integral accumulation to errors below it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub start_i: Option<f64>,
}

impl PidGains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            start_i: None,
        }
    }

    pub const fn with_start_i(mut self, start_i: f64) -> Self {
        self.start_i = Some(start_i);
        self
    }
}

/// Raw exit-condition tuple as the controller receives it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitConditions {
    pub small_error: f64,
    pub small_time: Duration,
    pub big_error: f64,
    pub big_time: Duration,
    pub max_time: Duration,
}

/// One observation of the motion in flight.
///
/// `error` is the signed remaining distance (in) or heading error (deg) to the
/// target; `progress` is the signed amount travelled since the motion began.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    pub error: f64,
    pub progress: f64,
}
