mod cli;
mod error_fmt;
mod run;

use std::path::Path;

use auton_core::routines;
use clap::Parser;
use eyre::{Result, WrapErr};
use serde_json::json;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::{Tuning, check_all, run_named};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        tracing::error!(error = %e, "auton failed");
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = match &cli.config {
        Some(path) => auton_config::load_file(path)?,
        None => auton_config::Config::default(),
    };
    // dropping the guard flushes the file log
    let _file_guard = init_logging(cli.json, &cli.log_level, &cfg.logging)?;
    if let Some(path) = &cli.config {
        tracing::debug!(config = %path.display(), "config loaded");
    }

    match cli.cmd {
        Commands::Run {
            routine,
            realtime,
            obstacle,
        } => {
            let tuning = Tuning::from_config(&cfg)?;
            let report = run_named(&tuning, &routine, realtime, obstacle)?;
            if cli.json {
                println!("{}", report.to_json());
            } else {
                println!("{}", report.to_text());
            }
        }
        Commands::List => {
            if cli.json {
                let list: Vec<_> = routines::catalog()
                    .iter()
                    .map(|r| json!({ "name": r.name, "summary": r.summary }))
                    .collect();
                println!("{}", json!(list));
            } else {
                for r in routines::catalog() {
                    println!("{:<26} {}", r.name, r.summary);
                }
            }
        }
        Commands::Show { routine } => {
            let tuning = Tuning::from_config(&cfg)?;
            let script = routines::by_name(&routine, &tuning.params)?;
            if cli.json {
                let steps: Vec<String> = script.steps().iter().map(ToString::to_string).collect();
                println!("{}", json!({ "routine": script.name(), "steps": steps }));
            } else {
                println!("{}:", script.name());
                for (i, step) in script.steps().iter().enumerate() {
                    println!("  {i:>3}  {step}");
                }
            }
        }
        Commands::Check => {
            let tuning = Tuning::from_config(&cfg)?;
            let n = check_all(&tuning)?;
            if cli.json {
                println!("{}", json!({ "ok": true, "routines": n }));
            } else {
                println!("Config OK; {n} routines build.");
            }
        }
    }
    Ok(())
}

/// Console logs go to stderr so stdout carries only command output. An
/// optional JSON-lines file log comes from `[logging]`.
fn init_logging(
    json: bool,
    level: &str,
    logging: &auton_config::Logging,
) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    // RUST_LOG wins over --log-level
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level '{level}'"))?,
    };
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let mut guard = None;
    let file_layer = match &logging.file {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file '{file}' has no file name"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, g) = tracing_appender::non_blocking(appender);
            guard = Some(g);
            let file_level = logging.level.as_deref().unwrap_or("info");
            let file_filter = EnvFilter::try_new(file_level)
                .wrap_err_with(|| format!("invalid logging.level '{file_level}'"))?;
            Some(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console.with_filter(console_filter))
        .with(file_layer)
        .try_init()
        .wrap_err("initialise logging")?;
    Ok(guard)
}
