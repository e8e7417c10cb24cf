//! Runtime configuration for the sequencing engine.
//!
//! These are the validated types the executor works with. They are separate
//! from the TOML-deserialized config in `auton_config`; see `conversions`.

use std::time::Duration;

use auton_traits::{Drivetrain, ExitConditions, MotionKind, PidGains, PidLoop};
use tracing::info;

use crate::error::{AutonError, ConfigError, ExitConditionError, Result};
use crate::hw_error::map_hw_error;
use crate::util::{ms, speed_in_range};

/// One value per motion kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerKind<T> {
    pub drive: T,
    pub turn: T,
    pub swing: T,
}

impl<T> PerKind<T> {
    pub fn get(&self, kind: MotionKind) -> &T {
        match kind {
            MotionKind::Drive => &self.drive,
            MotionKind::Turn => &self.turn,
            MotionKind::Swing => &self.swing,
        }
    }
}

// ── Exit conditions ──────────────────────────────────────────────────────────

/// Settle windows and hard timeout of one motion kind.
///
/// A motion is complete once `|error| <= small_error` has held for
/// `small_time`, or `|error| <= big_error` has held for `big_time`, or
/// `max_time` has elapsed since it was submitted, whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitConditionProfile {
    small_error: f64,
    small_time: Duration,
    big_error: f64,
    big_time: Duration,
    max_time: Duration,
}

impl ExitConditionProfile {
    pub fn new(
        small_error: f64,
        small_time: Duration,
        big_error: f64,
        big_time: Duration,
        max_time: Duration,
    ) -> std::result::Result<Self, ExitConditionError> {
        let profile = Self {
            small_error,
            small_time,
            big_error,
            big_time,
            max_time,
        };
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> std::result::Result<(), ExitConditionError> {
        let band_ok = |v: f64| v.is_finite() && v >= 0.0;
        if !band_ok(self.small_error) || !band_ok(self.big_error) {
            return Err(ExitConditionError::InvalidErrorBand);
        }
        if self.small_error > self.big_error {
            return Err(ExitConditionError::ErrorBandOrder {
                small: self.small_error,
                big: self.big_error,
            });
        }
        if self.small_time > self.big_time {
            return Err(ExitConditionError::SettleTimeOrder {
                small: self.small_time,
                big: self.big_time,
            });
        }
        if self.big_time > self.max_time {
            return Err(ExitConditionError::TimeoutOrder {
                big: self.big_time,
                max: self.max_time,
            });
        }
        if self.max_time.is_zero() {
            return Err(ExitConditionError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn small_error(&self) -> f64 {
        self.small_error
    }
    pub fn small_time(&self) -> Duration {
        self.small_time
    }
    pub fn big_error(&self) -> f64 {
        self.big_error
    }
    pub fn big_time(&self) -> Duration {
        self.big_time
    }
    pub fn max_time(&self) -> Duration {
        self.max_time
    }

    /// Same windows with a different hard timeout.
    pub fn with_max_time(self, max_time: Duration) -> std::result::Result<Self, ExitConditionError> {
        Self::new(
            self.small_error,
            self.small_time,
            self.big_error,
            self.big_time,
            max_time,
        )
    }

    pub fn to_raw(&self) -> ExitConditions {
        ExitConditions {
            small_error: self.small_error,
            small_time: self.small_time,
            big_error: self.big_error,
            big_time: self.big_time,
            max_time: self.max_time,
        }
    }

    const fn drive_default() -> Self {
        Self {
            small_error: 1.0,
            small_time: Duration::from_millis(80),
            big_error: 3.0,
            big_time: Duration::from_millis(250),
            max_time: Duration::from_millis(500),
        }
    }

    const fn angular_default() -> Self {
        Self {
            small_error: 3.0,
            small_time: Duration::from_millis(80),
            big_error: 7.0,
            big_time: Duration::from_millis(250),
            max_time: Duration::from_millis(500),
        }
    }
}

impl TryFrom<ExitConditions> for ExitConditionProfile {
    type Error = ExitConditionError;

    fn try_from(raw: ExitConditions) -> std::result::Result<Self, Self::Error> {
        Self::new(
            raw.small_error,
            raw.small_time,
            raw.big_error,
            raw.big_time,
            raw.max_time,
        )
    }
}

// ── Slew and recovery ────────────────────────────────────────────────────────

/// Speed cap applied over the first `distance` inches of a slewed drive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlewSettings {
    pub distance: f64,
    pub max_speed: f64,
}

/// Parameters of one corrective attempt after a drive reports interference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryProfile {
    /// Magnitude (in) of the corrective drive; it runs opposite to the stalled drive.
    pub corrective_distance: f64,
    pub corrective_speed: f64,
    /// Pause after the corrective drive before the flag is read again.
    pub settle_delay: Duration,
}

impl Default for RecoveryProfile {
    fn default() -> Self {
        Self {
            corrective_distance: 2.0,
            corrective_speed: 20.0,
            settle_delay: Duration::from_millis(1_000),
        }
    }
}

// ── ConfigurationProfile ─────────────────────────────────────────────────────

/// Everything pushed into the drivetrain controller before a routine runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationProfile {
    pub heading_gains: PidGains,
    pub drive_gains: PidGains,
    pub turn_gains: PidGains,
    pub swing_gains: PidGains,
    pub exit: PerKind<ExitConditionProfile>,
    pub chain: PerKind<f64>,
    pub slew: SlewSettings,
    /// Multiplier correcting heading sensor drift.
    pub heading_scale: f64,
    /// How often a waiting executor samples the drivetrain.
    pub poll_period: Duration,
}

impl Default for ConfigurationProfile {
    fn default() -> Self {
        Self {
            heading_gains: PidGains::new(11.0, 0.0, 20.0),
            drive_gains: PidGains::new(20.0, 0.0, 100.0),
            turn_gains: PidGains::new(3.0, 0.05, 20.0).with_start_i(15.0),
            swing_gains: PidGains::new(6.0, 0.0, 65.0),
            exit: PerKind {
                drive: ExitConditionProfile::drive_default(),
                turn: ExitConditionProfile::angular_default(),
                swing: ExitConditionProfile::angular_default(),
            },
            chain: PerKind {
                drive: 3.0,
                turn: 3.0,
                swing: 5.0,
            },
            slew: SlewSettings {
                distance: 7.0,
                max_speed: 80.0,
            },
            heading_scale: 1.0115,
            poll_period: Duration::from_millis(10),
        }
    }
}

impl ConfigurationProfile {
    /// Gains of a single loop.
    pub fn gains(&self, which: PidLoop) -> PidGains {
        match which {
            PidLoop::Heading => self.heading_gains,
            PidLoop::Drive => self.drive_gains,
            PidLoop::Turn => self.turn_gains,
            PidLoop::Swing => self.swing_gains,
        }
    }

    /// Check every field; a malformed profile is rejected, never clamped.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for which in [PidLoop::Heading, PidLoop::Drive, PidLoop::Turn, PidLoop::Swing] {
            let g = self.gains(which);
            let ok = |v: f64| v.is_finite() && v >= 0.0;
            if !(ok(g.kp) && ok(g.ki) && ok(g.kd) && g.start_i.is_none_or(ok)) {
                return Err(ConfigError::Invalid("PID gains must be finite and >= 0"));
            }
        }
        for kind in MotionKind::ALL {
            let exit = self.exit.get(kind);
            exit.validate()
                .map_err(|source| ConfigError::Exit { kind, source })?;
            let threshold = *self.chain.get(kind);
            if !threshold.is_finite() || threshold < exit.small_error() {
                return Err(ConfigError::ChainThreshold {
                    kind,
                    threshold,
                    small_error: exit.small_error(),
                });
            }
        }
        if !(self.slew.distance.is_finite() && self.slew.distance >= 0.0) {
            return Err(ConfigError::Invalid("slew distance must be finite and >= 0"));
        }
        if !speed_in_range(self.slew.max_speed) {
            return Err(ConfigError::Invalid("slew speed must be in (0, 127]"));
        }
        if !(self.heading_scale.is_finite() && self.heading_scale > 0.0) {
            return Err(ConfigError::Invalid("heading scale must be > 0"));
        }
        if self.poll_period.is_zero() {
            return Err(ConfigError::Invalid("poll period must be > 0"));
        }
        Ok(())
    }

    /// Validate, then push gains, exit conditions, chain thresholds, slew and
    /// heading scale into the controller. Nothing is written if validation fails.
    pub fn apply<D: Drivetrain + ?Sized>(&self, drivetrain: &mut D) -> Result<()> {
        self.validate().map_err(AutonError::from)?;

        let hw = |e: Box<dyn std::error::Error + Send + Sync>| map_hw_error(e.as_ref());
        for which in [PidLoop::Heading, PidLoop::Drive, PidLoop::Turn, PidLoop::Swing] {
            drivetrain.set_pid_gains(which, self.gains(which)).map_err(hw)?;
        }
        for kind in MotionKind::ALL {
            drivetrain
                .set_exit_conditions(kind, self.exit.get(kind).to_raw())
                .map_err(hw)?;
            drivetrain
                .set_chain_threshold(kind, *self.chain.get(kind))
                .map_err(hw)?;
        }
        drivetrain
            .set_slew(self.slew.distance, self.slew.max_speed)
            .map_err(hw)?;
        drivetrain.set_heading_scale(self.heading_scale).map_err(hw)?;

        info!(
            drive_max_ms = ms(self.exit.drive.max_time()),
            turn_max_ms = ms(self.exit.turn.max_time()),
            swing_max_ms = ms(self.exit.swing.max_time()),
            heading_scale = self.heading_scale,
            "configuration profile applied"
        );
        Ok(())
    }
}
