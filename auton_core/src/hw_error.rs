//! Maps `Box<dyn Error>` from trait boundaries to typed `AutonError`.
//!
//! The traits in `auton_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver stack can plug in; this module converts those to our typed error
//! enum, with an optional feature-gated path for `auton_hardware::HwError`
//! downcasting.

use crate::error::AutonError;

/// Map a trait-boundary error to a typed `AutonError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> AutonError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<auton_hardware::error::HwError>() {
            return match hw {
                auton_hardware::error::HwError::Timeout => AutonError::HardwareTimeout,
                other => AutonError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        AutonError::HardwareTimeout
    } else {
        AutonError::Hardware(s)
    }
}
