#![no_main]
use libfuzzer_sys::fuzz_target;

use auton_core::{ConfigurationProfile, RoutineParams, routines};

fuzz_target!(|data: &str| {
    // Parse, validate and convert must reject bad input without panicking.
    let Ok(cfg) = auton_config::load_toml(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    if ConfigurationProfile::try_from(&cfg).is_err() {
        return;
    }
    let params = RoutineParams::from(&cfg);
    for info in routines::catalog() {
        let _ = info.build(&params);
    }
});
