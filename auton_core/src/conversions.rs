//! Conversions bridging `auton_config` types to `auton_core` types.
//!
//! Exit tuples are re-validated here, so a hand-built `Config` that skipped
//! `validate()` still cannot produce a malformed profile.

use std::time::Duration;

use auton_traits::{MotionKind, PidGains};

use crate::config::{
    ConfigurationProfile, ExitConditionProfile, PerKind, RecoveryProfile, SlewSettings,
};
use crate::error::ConfigError;
use crate::routines::{RoutineParams, Speeds};

// ── Gains ────────────────────────────────────────────────────────────────────

fn gains(g: &auton_config::Gains) -> PidGains {
    PidGains {
        kp: g.kp,
        ki: g.ki,
        kd: g.kd,
        start_i: g.start_i,
    }
}

// ── Exit conditions ──────────────────────────────────────────────────────────

fn exit_profile(
    kind: MotionKind,
    c: &auton_config::ExitCfg,
) -> Result<ExitConditionProfile, ConfigError> {
    ExitConditionProfile::new(
        c.small_error,
        Duration::from_millis(c.small_time_ms),
        c.big_error,
        Duration::from_millis(c.big_time_ms),
        Duration::from_millis(c.max_time_ms),
    )
    .map_err(|source| ConfigError::Exit { kind, source })
}

// ── ConfigurationProfile ─────────────────────────────────────────────────────

impl TryFrom<&auton_config::Config> for ConfigurationProfile {
    type Error = ConfigError;

    fn try_from(c: &auton_config::Config) -> Result<Self, Self::Error> {
        let profile = Self {
            heading_gains: gains(&c.pid.heading),
            drive_gains: gains(&c.pid.drive),
            turn_gains: gains(&c.pid.turn),
            swing_gains: gains(&c.pid.swing),
            exit: PerKind {
                drive: exit_profile(MotionKind::Drive, &c.exit.drive)?,
                turn: exit_profile(MotionKind::Turn, &c.exit.turn)?,
                swing: exit_profile(MotionKind::Swing, &c.exit.swing)?,
            },
            chain: PerKind {
                drive: c.chain.drive,
                turn: c.chain.turn,
                swing: c.chain.swing,
            },
            slew: SlewSettings {
                distance: c.slew.distance_in,
                max_speed: c.slew.max_speed,
            },
            heading_scale: c.imu.scale,
            poll_period: Duration::from_millis(c.executor.poll_ms),
        };
        profile.validate()?;
        Ok(profile)
    }
}

// ── Recovery and routine parameters ──────────────────────────────────────────

impl From<&auton_config::RecoveryCfg> for RecoveryProfile {
    fn from(c: &auton_config::RecoveryCfg) -> Self {
        Self {
            corrective_distance: c.corrective_distance_in,
            corrective_speed: c.corrective_speed,
            settle_delay: Duration::from_millis(c.settle_ms),
        }
    }
}

impl From<&auton_config::Speeds> for Speeds {
    fn from(c: &auton_config::Speeds) -> Self {
        Self {
            drive: c.drive,
            turn: c.turn,
            swing: c.swing,
        }
    }
}

impl From<&auton_config::Config> for RoutineParams {
    fn from(c: &auton_config::Config) -> Self {
        Self {
            speeds: (&c.speeds).into(),
            retry_attempts: c.recovery.max_attempts,
        }
    }
}
