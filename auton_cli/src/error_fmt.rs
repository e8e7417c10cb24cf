//! Human-readable error descriptions and structured JSON error formatting.

use auton_core::{AutonError, UsageError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(ae) = err.downcast_ref::<AutonError>() {
        return match ae {
            AutonError::Config(ce) => format!(
                "What happened: Invalid tuning profile ({ce}).\nLikely causes: Exit-condition windows out of order or a chain threshold tighter than the small window.\nHow to fix: Edit the [exit.*] and [chain] sections of the config, then rerun `auton check`."
            ),
            AutonError::Usage(UsageError::UnknownRoutine(name)) => format!(
                "What happened: There is no routine called '{name}'.\nLikely causes: A typo, or a routine from another season.\nHow to fix: Run `auton list` to see the available routines."
            ),
            AutonError::Usage(ue) => format!(
                "What happened: The engine was driven out of contract ({ue}).\nLikely causes: A routine waits on, speeds up or submits a motion out of order.\nHow to fix: Fix the routine's step order; every launch needs a matching wait or release."
            ),
            AutonError::Script(se) => format!(
                "What happened: A routine failed validation ({se}).\nLikely causes: A speed outside (0, 127], an empty retry budget, or a wait with nothing in flight.\nHow to fix: Check the configured speeds and [recovery] max_attempts, then rerun `auton check`."
            ),
            AutonError::HardwareTimeout => "What happened: A device did not answer in time.\nLikely causes: Loose cable or a brain link dropout.\nHow to fix: Check the device connections and rerun.".to_string(),
            AutonError::Hardware(msg) | AutonError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Unplugged motor or pneumatics port.\nHow to fix: Check the device named above and rerun with --log-level=debug."
            ),
        };
    }

    // String-based heuristics for errors coming from config loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: Could not read the config file ({msg}).\nLikely causes: Wrong path or missing permissions.\nHow to fix: Pass an existing file with --config, or omit it to use the built-in tuning."
        );
    }

    if lower.starts_with("parse config") {
        let cause = err.source().map(|s| format!(" Cause: {s}")).unwrap_or_default();
        return format!(
            "What happened: The config file is not valid TOML for this robot.{cause}\nHow to fix: Compare it with etc/auton.toml."
        );
    }

    if names_config_key(&lower) {
        return format!(
            "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `auton check`."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Validation messages from `auton_config` start with the offending `section.key`.
fn names_config_key(lower: &str) -> bool {
    [
        "speeds.", "pid.", "exit.", "chain.", "slew.", "imu.", "recovery.", "executor.", "logging.",
    ]
    .iter()
    .any(|section| lower.starts_with(section))
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<AutonError>() {
        Some(AutonError::Config(_)) => "Config",
        Some(AutonError::Usage(UsageError::UnknownRoutine(_))) => "UnknownRoutine",
        Some(AutonError::Usage(_)) => "Usage",
        Some(AutonError::Script(_)) => "Script",
        Some(e) if e.is_hardware() => "Hardware",
        Some(_) => "Error",
        None => {
            let lower = err.to_string().to_ascii_lowercase();
            if lower.starts_with("read config")
                || lower.starts_with("parse config")
                || names_config_key(&lower)
            {
                "Config"
            } else {
                "Error"
            }
        }
    }
}

/// Stable exit codes per error class; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match reason_name(err) {
        "Config" => 3,
        "UnknownRoutine" => 4,
        "Usage" => 5,
        "Script" => 6,
        "Hardware" => 7,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use auton_core::ConfigError;

    #[test]
    fn typed_errors_get_stable_codes() {
        let unknown: eyre::Report =
            AutonError::from(UsageError::UnknownRoutine("skills".into())).into();
        assert_eq!(exit_code_for_error(&unknown), 4);
        assert!(humanize(&unknown).contains("auton list"));

        let config: eyre::Report = AutonError::from(ConfigError::Invalid("poll period must be > 0")).into();
        assert_eq!(exit_code_for_error(&config), 3);
        assert!(format_error_json(&config).contains("\"reason\":\"Config\""));
    }

    #[test]
    fn config_section_messages_are_recognised() {
        let err = eyre::eyre!("chain.turn must be >= exit.turn.small_error");
        assert!(humanize(&err).starts_with("What happened: Invalid configuration"));
        assert_eq!(exit_code_for_error(&err), 3);
        assert_eq!(exit_code_for_error(&eyre::eyre!("disk full")), 1);
    }
}
