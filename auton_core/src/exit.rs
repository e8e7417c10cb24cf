//! Exit-condition evaluation, kept free of I/O so it can be tested directly.

use std::time::Duration;

use crate::config::ExitConditionProfile;
use crate::motion::SettleReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Running,
    Settled(SettleReason),
    TimedOut,
}

/// Tracks how long the error has stayed inside each settle band.
///
/// Feed it `(elapsed since submission, signed error)` observations in time
/// order. Windows are independent: leaving a band resets only that band's
/// timer. When several conditions hold at the same observation the small
/// window wins over the big one, and either wins over the timeout.
#[derive(Debug, Clone)]
pub struct ExitTracker {
    profile: ExitConditionProfile,
    small_since: Option<Duration>,
    big_since: Option<Duration>,
}

impl ExitTracker {
    pub fn new(profile: ExitConditionProfile) -> Self {
        Self {
            profile,
            small_since: None,
            big_since: None,
        }
    }

    pub fn profile(&self) -> &ExitConditionProfile {
        &self.profile
    }

    pub fn update(&mut self, elapsed: Duration, error: f64) -> ExitState {
        // NaN compares false and counts as outside both bands
        let abs = error.abs();
        let small_held = track(&mut self.small_since, abs <= self.profile.small_error(), elapsed);
        let big_held = track(&mut self.big_since, abs <= self.profile.big_error(), elapsed);

        if small_held >= Some(self.profile.small_time()) {
            ExitState::Settled(SettleReason::SmallError)
        } else if big_held >= Some(self.profile.big_time()) {
            ExitState::Settled(SettleReason::BigError)
        } else if elapsed >= self.profile.max_time() {
            ExitState::TimedOut
        } else {
            ExitState::Running
        }
    }

    /// Time left before the hard timeout.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.profile.max_time().saturating_sub(elapsed)
    }
}

/// Update one band timer and return how long the error has been inside it.
fn track(since: &mut Option<Duration>, inside: bool, now: Duration) -> Option<Duration> {
    if inside {
        let entered = *since.get_or_insert(now);
        Some(now.saturating_sub(entered))
    } else {
        *since = None;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn turn_profile() -> ExitConditionProfile {
        ExitConditionProfile::new(3.0, ms(80), 7.0, ms(250), ms(500)).unwrap()
    }

    #[test]
    fn small_window_settles_after_hold_time() {
        let mut t = ExitTracker::new(turn_profile());
        assert_eq!(t.update(ms(0), 20.0), ExitState::Running);
        assert_eq!(t.update(ms(100), 2.0), ExitState::Running);
        assert_eq!(t.update(ms(170), -2.5), ExitState::Running);
        assert_eq!(
            t.update(ms(180), 1.0),
            ExitState::Settled(SettleReason::SmallError)
        );
    }

    #[test]
    fn leaving_the_band_restarts_the_window() {
        let mut t = ExitTracker::new(turn_profile());
        t.update(ms(0), 2.0);
        t.update(ms(70), 4.0);
        assert_eq!(t.update(ms(100), 2.0), ExitState::Running);
        assert_eq!(t.update(ms(170), 2.0), ExitState::Running);
        assert_eq!(
            t.update(ms(180), 2.0),
            ExitState::Settled(SettleReason::SmallError)
        );
    }

    #[test]
    fn big_window_settles_when_small_never_holds() {
        let mut t = ExitTracker::new(turn_profile());
        for step in 0..25 {
            assert_eq!(t.update(ms(step * 10), 5.0), ExitState::Running);
        }
        assert_eq!(
            t.update(ms(250), 5.0),
            ExitState::Settled(SettleReason::BigError)
        );
    }

    #[test]
    fn times_out_at_max_time() {
        let mut t = ExitTracker::new(turn_profile());
        assert_eq!(t.update(ms(490), 30.0), ExitState::Running);
        assert_eq!(t.update(ms(500), 30.0), ExitState::TimedOut);
        assert_eq!(t.remaining(ms(490)), ms(10));
        assert_eq!(t.remaining(ms(700)), Duration::ZERO);
    }

    #[test]
    fn settle_beats_timeout_on_the_same_observation() {
        let p = ExitConditionProfile::new(1.0, ms(0), 3.0, ms(0), ms(100)).unwrap();
        let mut t = ExitTracker::new(p);
        assert_eq!(
            t.update(ms(100), 0.5),
            ExitState::Settled(SettleReason::SmallError)
        );
    }

    #[test]
    fn nan_error_never_settles() {
        let mut t = ExitTracker::new(turn_profile());
        assert_eq!(t.update(ms(0), f64::NAN), ExitState::Running);
        assert_eq!(t.update(ms(300), f64::NAN), ExitState::Running);
        assert_eq!(t.update(ms(500), f64::NAN), ExitState::TimedOut);
    }

    proptest! {
        // Whatever the error trace, the tracker stops no later than max_time.
        #[test]
        fn never_runs_past_max_time(errors in proptest::collection::vec(-50.0f64..50.0, 1..120)) {
            let mut t = ExitTracker::new(turn_profile());
            let mut stopped = None;
            for (i, e) in errors.iter().enumerate() {
                let now = ms(i as u64 * 10);
                if t.update(now, *e) != ExitState::Running {
                    stopped = Some(now);
                    break;
                }
            }
            if let Some(at) = stopped {
                prop_assert!(at <= ms(500));
            } else {
                prop_assert!((errors.len() as u64 - 1) * 10 < 500);
            }
        }
    }
}
