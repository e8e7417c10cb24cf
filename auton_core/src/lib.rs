#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Autonomous routine sequencing engine (hardware-agnostic).
//!
//! All hardware interactions go through the `auton_traits` collaborator
//! traits (`Drivetrain`, `Piston`, `Roller`, `Lift`).
//!
//! ## Architecture
//!
//! - **Configuration**: validated runtime profile pushed into the drivetrain
//!   once (`config`, `conversions`)
//! - **Exit conditions**: pure settle-window and timeout tracking (`exit`)
//! - **Execution**: one outstanding motion at a time, three wait modes
//!   (`executor`, `motion`)
//! - **Recovery**: bounded corrective attempts after interference (`recovery`)
//! - **Scripts**: immutable, statically validated step lists and the runner
//!   that plays them (`script`, `runner`, `routines`)
//!
//! Errors are `eyre::Report`s wrapping a typed `AutonError`; classify them
//! with `downcast_ref::<AutonError>()`.

pub mod config;
pub mod conversions;
pub mod error;
pub mod executor;
pub mod exit;
pub mod hw_error;
pub mod mocks;
pub mod motion;
pub mod recovery;
pub mod routines;
pub mod runner;
pub mod script;
pub mod util;

pub use config::{ConfigurationProfile, ExitConditionProfile, PerKind, RecoveryProfile, SlewSettings};
pub use error::{AutonError, ConfigError, Report, Result, ScriptError, ScriptFault, UsageError};
pub use executor::{MotionExecutor, MotionHandle};
pub use exit::{ExitState, ExitTracker};
pub use motion::{Motion, MotionRequest, SettleReason, WaitMode, WaitOutcome, WaitStatus};
pub use recovery::{InterferenceRecoveryPolicy, PolicyState, RecoveryOutcome, attempt_recovery};
pub use routines::{RoutineInfo, RoutineParams, Speeds};
pub use runner::{Mechanisms, RunStats, ScriptRunner};
pub use script::{Actuator, ActuatorCommand, RoutineScript, ScriptBuilder, Step};
