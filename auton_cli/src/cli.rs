//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "auton", version, about = "Autonomous routine runner")]
pub struct Cli {
    /// Path to config TOML; built-in tuning is used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a routine against the simulated robot
    Run {
        /// Routine name (see `auton list`)
        routine: String,
        /// Run on the wall clock instead of simulated time
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Run on the wall clock.\n\nBy default the routine runs on a simulated clock and finishes instantly with the same timing it would have on the field. With --realtime every wait and delay takes its real duration, which is useful for watching the log stream."
        )]
        realtime: bool,
        /// Block this many drives halfway, raising the interference flag
        #[arg(long, value_name = "N", default_value_t = 0)]
        obstacle: u32,
    },
    /// List the authored routines
    List,
    /// Print the steps of a routine
    Show {
        /// Routine name (see `auton list`)
        routine: String,
    },
    /// Validate the config and build every routine
    Check,
}
