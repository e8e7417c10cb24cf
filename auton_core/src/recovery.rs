//! Bounded recovery after a drive reports interference.

use auton_traits::Drivetrain;

use crate::config::RecoveryProfile;
use crate::error::Result;
use crate::executor::MotionExecutor;
use crate::motion::{MotionRequest, WaitMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The flag cleared after `attempts` corrective attempts.
    Resolved { attempts: u32 },
    /// Budget exhausted with the flag still set.
    Unresolved { attempts: u32 },
}

impl RecoveryOutcome {
    pub fn attempts(self) -> u32 {
        match self {
            RecoveryOutcome::Resolved { attempts } | RecoveryOutcome::Unresolved { attempts } => {
                attempts
            }
        }
    }
}

/// Run up to `max_attempts - 1` attempts, stopping at the first one that
/// reports the interference cleared. `attempt` receives the 1-based attempt
/// number and returns whether the flag is now clear.
///
/// The budget counts the original motion as the first try, so a budget of 1
/// makes no corrective attempts at all.
pub fn attempt_recovery<F>(max_attempts: u32, mut attempt: F) -> Result<RecoveryOutcome>
where
    F: FnMut(u32) -> Result<bool>,
{
    let budget = max_attempts.saturating_sub(1);
    for n in 1..=budget {
        if attempt(n)? {
            return Ok(RecoveryOutcome::Resolved { attempts: n });
        }
    }
    Ok(RecoveryOutcome::Unresolved { attempts: budget })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    Normal,
    Recovering,
}

/// Corrective-drive policy. Each attempt zeroes the position reference,
/// creeps a short distance back from the obstruction, waits for it,
/// pauses, then reads the interference flag again.
#[derive(Debug, Clone)]
pub struct InterferenceRecoveryPolicy {
    profile: RecoveryProfile,
    state: PolicyState,
}

impl InterferenceRecoveryPolicy {
    pub fn new(profile: RecoveryProfile) -> Self {
        Self {
            profile,
            state: PolicyState::Normal,
        }
    }

    pub fn state(&self) -> PolicyState {
        self.state
    }

    pub fn profile(&self) -> &RecoveryProfile {
        &self.profile
    }

    /// Recover from interference on a drive toward `direction` (its sign is
    /// all that matters); corrective drives go the opposite way. The executor
    /// must be idle. The policy is back in
    /// `Normal` when this returns, whatever the result.
    pub fn recover<D: Drivetrain>(
        &mut self,
        executor: &mut MotionExecutor<D>,
        direction: f64,
        max_attempts: u32,
    ) -> Result<RecoveryOutcome> {
        self.state = PolicyState::Recovering;
        let profile = self.profile;
        let corrective = MotionRequest::drive(
            profile.corrective_distance.copysign(-direction),
            profile.corrective_speed,
        );
        let result = attempt_recovery(max_attempts, |n| {
            executor.reset_sensors()?;
            let handle = executor.submit(corrective)?;
            executor.wait(&handle, WaitMode::Blocking)?;
            executor.clock().sleep(profile.settle_delay);
            let cleared = !executor.interfered();
            tracing::info!(attempt = n, cleared, "corrective drive finished");
            Ok(cleared)
        });
        self.state = PolicyState::Normal;

        match &result {
            Ok(RecoveryOutcome::Resolved { attempts }) => {
                tracing::info!(attempts, "interference resolved");
            }
            Ok(RecoveryOutcome::Unresolved { attempts }) => {
                tracing::warn!(attempts, "interference unresolved; continuing");
            }
            Err(e) => tracing::error!(error = %e, "recovery aborted"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stops_at_first_clear_attempt() {
        let mut calls = Vec::new();
        let out = attempt_recovery(5, |n| {
            calls.push(n);
            Ok(n == 2)
        })
        .unwrap();
        assert_eq!(out, RecoveryOutcome::Resolved { attempts: 2 });
        assert_eq!(calls, [1, 2]);
    }

    #[test]
    fn budget_of_one_makes_no_attempts() {
        let out = attempt_recovery(1, |_| -> Result<bool> { panic!("must not run") }).unwrap();
        assert_eq!(out, RecoveryOutcome::Unresolved { attempts: 0 });
    }

    #[test]
    fn errors_stop_the_loop() {
        let mut calls = 0;
        let res = attempt_recovery(4, |_| {
            calls += 1;
            Err(eyre::eyre!("drivetrain offline"))
        });
        assert!(res.is_err());
        assert_eq!(calls, 1);
    }

    proptest! {
        #[test]
        fn never_exceeds_budget_minus_one(max in 0u32..20, clears_at in proptest::option::of(1u32..25)) {
            let mut calls = 0u32;
            let out = attempt_recovery(max, |n| {
                calls += 1;
                Ok(Some(n) == clears_at)
            }).unwrap();
            prop_assert!(calls <= max.saturating_sub(1));
            prop_assert_eq!(out.attempts(), calls);
            match out {
                RecoveryOutcome::Resolved { attempts } => prop_assert_eq!(Some(attempts), clears_at),
                RecoveryOutcome::Unresolved { .. } => prop_assert!(clears_at.is_none_or(|c| c > calls)),
            }
        }
    }
}
