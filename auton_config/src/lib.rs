#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the autonomous sequencing engine.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; omitted sections fall back to the tuned
//!   competition constants.
use eyre::WrapErr;
use serde::Deserialize;

/// Default speeds, on the 0..=127 motor scale.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct Speeds {
    pub drive: f64,
    pub turn: f64,
    pub swing: f64,
}

impl Default for Speeds {
    fn default() -> Self {
        Self {
            drive: 110.0,
            turn: 90.0,
            swing: 90.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Integral only accumulates once |error| is below this value.
    #[serde(default)]
    pub start_i: Option<f64>,
}

impl Gains {
    const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            start_i: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PidCfg {
    pub heading: Gains,
    pub drive: Gains,
    pub turn: Gains,
    pub swing: Gains,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            heading: Gains::new(11.0, 0.0, 20.0),
            drive: Gains::new(20.0, 0.0, 100.0),
            turn: Gains {
                start_i: Some(15.0),
                ..Gains::new(3.0, 0.05, 20.0)
            },
            swing: Gains::new(6.0, 0.0, 65.0),
        }
    }
}

/// One exit-condition tuple. Errors are inches (drive) or degrees (turn/swing).
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ExitCfg {
    pub small_error: f64,
    pub small_time_ms: u64,
    pub big_error: f64,
    pub big_time_ms: u64,
    /// Hard ceiling; the motion is treated as complete once this elapses.
    pub max_time_ms: u64,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ExitSection {
    pub drive: ExitCfg,
    pub turn: ExitCfg,
    pub swing: ExitCfg,
}

impl Default for ExitSection {
    fn default() -> Self {
        let angular = ExitCfg {
            small_error: 3.0,
            small_time_ms: 80,
            big_error: 7.0,
            big_time_ms: 250,
            max_time_ms: 500,
        };
        Self {
            drive: ExitCfg {
                small_error: 1.0,
                small_time_ms: 80,
                big_error: 3.0,
                big_time_ms: 250,
                max_time_ms: 500,
            },
            turn: angular,
            swing: angular,
        }
    }
}

/// Error below which a quick-chained motion hands over to the next one.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ChainCfg {
    pub drive: f64,
    pub turn: f64,
    pub swing: f64,
}

impl Default for ChainCfg {
    fn default() -> Self {
        Self {
            drive: 3.0,
            turn: 3.0,
            swing: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SlewCfg {
    /// Distance (in) over which the speed cap applies at the start of a drive.
    pub distance_in: f64,
    pub max_speed: f64,
}

impl Default for SlewCfg {
    fn default() -> Self {
        Self {
            distance_in: 7.0,
            max_speed: 80.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ImuCfg {
    /// Multiplier correcting the heading sensor's drift per revolution.
    pub scale: f64,
}

impl Default for ImuCfg {
    fn default() -> Self {
        Self { scale: 1.0115 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RecoveryCfg {
    /// Attempt budget N; at most N-1 corrective attempts are made.
    pub max_attempts: u32,
    pub corrective_distance_in: f64,
    pub corrective_speed: f64,
    pub settle_ms: u64,
}

impl Default for RecoveryCfg {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            corrective_distance_in: 2.0,
            corrective_speed: 20.0,
            settle_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ExecutorCfg {
    /// How often a waiting executor samples the drivetrain.
    pub poll_ms: u64,
}

impl Default for ExecutorCfg {
    fn default() -> Self {
        Self { poll_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub speeds: Speeds,
    #[serde(default)]
    pub pid: PidCfg,
    #[serde(default)]
    pub exit: ExitSection,
    #[serde(default)]
    pub chain: ChainCfg,
    #[serde(default)]
    pub slew: SlewCfg,
    #[serde(default)]
    pub imu: ImuCfg,
    #[serde(default)]
    pub recovery: RecoveryCfg,
    #[serde(default)]
    pub executor: ExecutorCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn check_speed(name: &str, v: f64) -> eyre::Result<()> {
    if !(v.is_finite() && v > 0.0 && v <= 127.0) {
        eyre::bail!("{name} must be in (0, 127]");
    }
    Ok(())
}

fn check_gains(name: &str, g: &Gains) -> eyre::Result<()> {
    for (field, v) in [("kp", g.kp), ("ki", g.ki), ("kd", g.kd)] {
        if !v.is_finite() || v < 0.0 {
            eyre::bail!("pid.{name}.{field} must be finite and >= 0");
        }
    }
    if let Some(start_i) = g.start_i
        && (!start_i.is_finite() || start_i < 0.0)
    {
        eyre::bail!("pid.{name}.start_i must be finite and >= 0");
    }
    Ok(())
}

fn check_exit(name: &str, e: &ExitCfg) -> eyre::Result<()> {
    if !e.small_error.is_finite() || e.small_error < 0.0 {
        eyre::bail!("exit.{name}.small_error must be finite and >= 0");
    }
    if !e.big_error.is_finite() || e.big_error < 0.0 {
        eyre::bail!("exit.{name}.big_error must be finite and >= 0");
    }
    if e.small_error > e.big_error {
        eyre::bail!("exit.{name}: small_error must be <= big_error");
    }
    if e.small_time_ms > e.big_time_ms {
        eyre::bail!("exit.{name}: small_time_ms must be <= big_time_ms");
    }
    if e.big_time_ms > e.max_time_ms {
        eyre::bail!("exit.{name}: big_time_ms must be <= max_time_ms");
    }
    if e.max_time_ms == 0 {
        eyre::bail!("exit.{name}.max_time_ms must be >= 1");
    }
    if e.max_time_ms > 15_000 {
        eyre::bail!("exit.{name}.max_time_ms is unreasonably large (>15s autonomous period)");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Speeds
        check_speed("speeds.drive", self.speeds.drive)?;
        check_speed("speeds.turn", self.speeds.turn)?;
        check_speed("speeds.swing", self.speeds.swing)?;

        // PID
        check_gains("heading", &self.pid.heading)?;
        check_gains("drive", &self.pid.drive)?;
        check_gains("turn", &self.pid.turn)?;
        check_gains("swing", &self.pid.swing)?;

        // Exit conditions
        check_exit("drive", &self.exit.drive)?;
        check_exit("turn", &self.exit.turn)?;
        check_exit("swing", &self.exit.swing)?;

        // Chain thresholds must be at least as loose as the small window
        for (name, chain, exit) in [
            ("drive", self.chain.drive, &self.exit.drive),
            ("turn", self.chain.turn, &self.exit.turn),
            ("swing", self.chain.swing, &self.exit.swing),
        ] {
            if !chain.is_finite() || chain < 0.0 {
                eyre::bail!("chain.{name} must be finite and >= 0");
            }
            if chain < exit.small_error {
                eyre::bail!("chain.{name} must be >= exit.{name}.small_error");
            }
        }

        // Slew
        if !self.slew.distance_in.is_finite() || self.slew.distance_in < 0.0 {
            eyre::bail!("slew.distance_in must be finite and >= 0");
        }
        check_speed("slew.max_speed", self.slew.max_speed)?;

        // IMU
        if !(self.imu.scale.is_finite() && self.imu.scale > 0.0) {
            eyre::bail!("imu.scale must be > 0");
        }

        // Recovery
        if self.recovery.max_attempts == 0 {
            eyre::bail!("recovery.max_attempts must be >= 1");
        }
        if !self.recovery.corrective_distance_in.is_finite()
            || self.recovery.corrective_distance_in <= 0.0
        {
            eyre::bail!("recovery.corrective_distance_in must be > 0");
        }
        check_speed("recovery.corrective_speed", self.recovery.corrective_speed)?;

        // Executor
        if self.executor.poll_ms == 0 {
            eyre::bail!("executor.poll_ms must be >= 1");
        }

        // Logging: only the rotation keyword is constrained
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
