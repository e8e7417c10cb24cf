use std::time::Duration;

use auton_traits::MotionKind;
use thiserror::Error;

use crate::script::Actuator;

/// Top-level engine error carried inside `eyre::Report`.
///
/// Callers classify a failure with `report.downcast_ref::<AutonError>()`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AutonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),
    #[error("script error: {0}")]
    Script(#[from] ScriptError),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout talking to hardware")]
    HardwareTimeout,
}

impl AutonError {
    /// Runtime faults of a collaborator. A running routine logs these and
    /// moves on; everything else is a programming or configuration mistake.
    pub fn is_hardware(&self) -> bool {
        matches!(
            self,
            AutonError::Hardware(_) | AutonError::HardwareFault(_) | AutonError::HardwareTimeout
        )
    }
}

/// A single exit-condition tuple violates its ordering invariants.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ExitConditionError {
    #[error("error bands must be finite and >= 0")]
    InvalidErrorBand,
    #[error("small_error {small} must be <= big_error {big}")]
    ErrorBandOrder { small: f64, big: f64 },
    #[error("small_time {small:?} must be <= big_time {big:?}")]
    SettleTimeOrder { small: Duration, big: Duration },
    #[error("big_time {big:?} must be <= max_time {max:?}")]
    TimeoutOrder { big: Duration, max: Duration },
    #[error("max_time must be > 0")]
    ZeroTimeout,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{kind} exit condition: {source}")]
    Exit {
        kind: MotionKind,
        #[source]
        source: ExitConditionError,
    },
    #[error("{kind} chain threshold {threshold} must be finite and >= small_error {small_error}")]
    ChainThreshold {
        kind: MotionKind,
        threshold: f64,
        small_error: f64,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// The engine was driven in a way its contract does not allow.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UsageError {
    #[error("a {kind} motion is still outstanding; wait on or release it first")]
    MotionOutstanding { kind: MotionKind },
    #[error("motion handle #{0} is not the active motion")]
    StaleHandle(u64),
    #[error("invalid motion request: {0}")]
    InvalidRequest(&'static str),
    #[error("{actuator} does not accept {command}")]
    UnsupportedCommand {
        actuator: Actuator,
        command: &'static str,
    },
    #[error("unknown routine '{0}'")]
    UnknownRoutine(String),
}

/// Static validation failure of a routine script.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("routine '{routine}' step {step}: {fault}")]
pub struct ScriptError {
    pub routine: String,
    pub step: usize,
    pub fault: ScriptFault,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptFault {
    #[error("invalid motion request: {0}")]
    InvalidRequest(&'static str),
    #[error("{actuator} does not accept {command}")]
    UnsupportedCommand {
        actuator: Actuator,
        command: &'static str,
    },
    #[error("intake power {0} outside -127..=127")]
    PowerOutOfRange(i32),
    #[error("lift speed {0} outside 1..=127")]
    LiftSpeedOutOfRange(i32),
    #[error("lift position must be finite")]
    LiftPosition,
    #[error("speed {0} outside (0, 127]")]
    SpeedOutOfRange(f64),
    #[error("progress threshold must be finite")]
    ProgressThreshold,
    #[error("a motion is already in flight")]
    MotionInFlight,
    #[error("no motion in flight")]
    NothingInFlight,
    #[error("retry blocks only wrap drive motions")]
    RetryNotDrive,
    #[error("retry block needs max_attempts >= 1")]
    ZeroAttempts,
    #[error("quick-chained motion is never followed by a blocking wait")]
    UnterminatedChain,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
