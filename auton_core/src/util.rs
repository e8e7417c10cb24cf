//! Small numeric helpers shared by the engine.

use std::time::Duration;

/// Top of the motor command scale.
pub const MOTOR_MAX: f64 = 127.0;

/// Whole milliseconds of a duration, saturating at `u64::MAX`.
#[inline]
pub fn ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// True for a usable primary speed: finite and in (0, 127].
#[inline]
pub fn speed_in_range(speed: f64) -> bool {
    speed > 0.0 && speed <= MOTOR_MAX
}
