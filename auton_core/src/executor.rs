//! Single-motion executor: submits requests to the drivetrain and waits on
//! them by polling its error and progress against the exit conditions.
//!
//! The executor owns the drivetrain, so nothing else can issue motions
//! behind its back. At most one motion is outstanding; submitting another
//! while a handle is live is a usage error rather than a silent supersede.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auton_traits::clock::{Clock, MonotonicClock};
use auton_traits::{Drivetrain, HwResult, MotionKind, MotionSample};

use crate::config::ConfigurationProfile;
use crate::error::{AutonError, Result, UsageError};
use crate::exit::{ExitState, ExitTracker};
use crate::hw_error::map_hw_error;
use crate::motion::{Motion, MotionRequest, WaitMode, WaitOutcome, WaitStatus};
use crate::util::{ms, speed_in_range};

/// Proof of an outstanding motion. Not `Clone`: one owner waits on it.
#[derive(Debug)]
#[must_use = "an outstanding motion blocks further submissions until waited on or released"]
pub struct MotionHandle {
    id: u64,
    kind: MotionKind,
}

impl MotionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn kind(&self) -> MotionKind {
        self.kind
    }
}

#[derive(Debug)]
struct ActiveMotion {
    id: u64,
    request: MotionRequest,
    started: Instant,
    tracker: ExitTracker,
    last: MotionSample,
    last_elapsed: Duration,
    /// Set once a settle window or the timeout ended the motion.
    finished: Option<WaitStatus>,
}

#[derive(Debug)]
enum Slot {
    Idle,
    Busy(ActiveMotion),
}

pub struct MotionExecutor<D: Drivetrain> {
    drivetrain: D,
    profile: ConfigurationProfile,
    clock: Arc<dyn Clock + Send + Sync>,
    slot: Slot,
    next_id: u64,
}

impl<D: Drivetrain> core::fmt::Debug for MotionExecutor<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MotionExecutor")
            .field("slot", &self.slot)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

fn hw(e: Box<dyn std::error::Error + Send + Sync>) -> AutonError {
    map_hw_error(e.as_ref())
}

fn crossed(progress: f64, threshold: f64) -> bool {
    if threshold >= 0.0 {
        progress >= threshold
    } else {
        progress <= threshold
    }
}

impl<D: Drivetrain> MotionExecutor<D> {
    /// Take ownership of the drivetrain and apply `profile` to it once.
    pub fn new(
        mut drivetrain: D,
        profile: ConfigurationProfile,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        profile.apply(&mut drivetrain)?;
        Ok(Self {
            drivetrain,
            profile,
            clock,
            slot: Slot::Idle,
            next_id: 1,
        })
    }

    /// Same as `new` on the wall clock.
    pub fn realtime(drivetrain: D, profile: ConfigurationProfile) -> Result<Self> {
        Self::new(drivetrain, profile, Arc::new(MonotonicClock::new()))
    }

    pub fn profile(&self) -> &ConfigurationProfile {
        &self.profile
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn drivetrain(&self) -> &D {
        &self.drivetrain
    }

    pub fn into_drivetrain(self) -> D {
        self.drivetrain
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.slot, Slot::Idle)
    }

    /// Kind of the outstanding motion, if any.
    pub fn active_kind(&self) -> Option<MotionKind> {
        match &self.slot {
            Slot::Idle => None,
            Slot::Busy(a) => Some(a.request.kind()),
        }
    }

    /// Start a motion. Fails while another motion is outstanding.
    pub fn submit(&mut self, request: MotionRequest) -> Result<MotionHandle> {
        if let Some(kind) = self.active_kind() {
            return Err(AutonError::from(UsageError::MotionOutstanding { kind }).into());
        }
        request
            .validate()
            .map_err(|why| AutonError::from(UsageError::InvalidRequest(why)))?;

        self.start(&request).map_err(hw)?;

        let id = self.next_id;
        self.next_id += 1;
        let kind = request.kind();
        self.slot = Slot::Busy(ActiveMotion {
            id,
            request,
            started: self.clock.now(),
            tracker: ExitTracker::new(*self.profile.exit.get(kind)),
            last: MotionSample::default(),
            last_elapsed: Duration::ZERO,
            finished: None,
        });
        tracing::debug!(id, motion = %request, "motion submitted");
        Ok(MotionHandle { id, kind })
    }

    fn start(&mut self, request: &MotionRequest) -> HwResult<()> {
        match request.motion {
            Motion::Drive { distance, slew } => {
                if slew && distance.abs() < self.profile.slew.distance {
                    tracing::warn!(
                        distance,
                        slew_distance = self.profile.slew.distance,
                        "slew distance exceeds drive distance; drive stays capped"
                    );
                }
                self.drivetrain.start_drive(distance, request.max_speed, slew)
            }
            Motion::Turn { heading } => self.drivetrain.start_turn(heading, request.max_speed),
            Motion::Swing {
                side,
                heading,
                still_speed,
            } => self
                .drivetrain
                .start_swing(side, heading, request.max_speed, still_speed),
        }
    }

    fn take_active(&mut self, handle: &MotionHandle) -> Result<ActiveMotion> {
        match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Busy(active) if active.id == handle.id => Ok(active),
            other => {
                self.slot = other;
                Err(AutonError::from(UsageError::StaleHandle(handle.id)).into())
            }
        }
    }

    /// Wait on the outstanding motion.
    ///
    /// `Blocking` and `QuickChain` consume the motion. `WaitUntil` leaves it
    /// outstanding: the settle timers and the clock origin carry over to the
    /// next wait on the same handle. No wait runs past the kind's `max_time`
    /// measured from submission.
    pub fn wait(&mut self, handle: &MotionHandle, mode: WaitMode) -> Result<WaitOutcome> {
        let mut active = self.take_active(handle)?;
        if let WaitMode::WaitUntil(p) = mode
            && !p.is_finite()
        {
            self.slot = Slot::Busy(active);
            return Err(AutonError::from(UsageError::InvalidRequest(
                "progress threshold must be finite",
            ))
            .into());
        }

        let kind = active.request.kind();
        let chain = *self.profile.chain.get(kind);
        let status = match active.finished {
            Some(done) => done,
            None => loop {
                // On a sampling fault the motion is dropped and we stay Idle.
                let sample = self.drivetrain.sample().map_err(|e| {
                    let err = hw(e);
                    tracing::error!(id = active.id, error = %err, "drivetrain fault while waiting");
                    err
                })?;
                let elapsed = self.clock.now().saturating_duration_since(active.started);
                active.last = sample;
                active.last_elapsed = elapsed;

                let state = active.tracker.update(elapsed, sample.error);
                if let ExitState::Settled(reason) = state {
                    active.finished = Some(WaitStatus::Settled(reason));
                    break WaitStatus::Settled(reason);
                }
                match mode {
                    WaitMode::QuickChain if sample.error.abs() <= chain => {
                        break WaitStatus::Chained;
                    }
                    WaitMode::WaitUntil(p) if crossed(sample.progress, p) => {
                        break WaitStatus::ProgressReached;
                    }
                    _ => {}
                }
                if state == ExitState::TimedOut {
                    active.finished = Some(WaitStatus::TimedOut);
                    break WaitStatus::TimedOut;
                }

                tracing::trace!(
                    id = active.id,
                    elapsed_ms = ms(elapsed),
                    error = sample.error,
                    progress = sample.progress,
                    "poll"
                );
                let nap = self.profile.poll_period.min(active.tracker.remaining(elapsed));
                self.clock.sleep(nap);
            },
        };

        let interfered = kind == MotionKind::Drive
            && !matches!(mode, WaitMode::QuickChain)
            && self.drivetrain.interfered();

        let outcome = WaitOutcome {
            kind,
            status,
            elapsed: active.last_elapsed,
            error: active.last.error,
            progress: active.last.progress,
            interfered,
        };
        if status == WaitStatus::TimedOut {
            tracing::warn!(
                id = active.id,
                motion = %active.request,
                elapsed_ms = ms(outcome.elapsed),
                error = outcome.error,
                "motion timed out; continuing"
            );
        } else {
            tracing::info!(
                id = active.id,
                motion = %active.request,
                status = %status,
                elapsed_ms = ms(outcome.elapsed),
                error = outcome.error,
                "wait complete"
            );
        }

        if matches!(mode, WaitMode::WaitUntil(_)) {
            self.slot = Slot::Busy(active);
        }
        Ok(outcome)
    }

    /// Change the speed cap of the outstanding motion.
    pub fn set_max_speed(&mut self, handle: &MotionHandle, speed: f64) -> Result<()> {
        if !speed_in_range(speed) {
            return Err(AutonError::from(UsageError::InvalidRequest(
                "max_speed must be in (0, 127]",
            ))
            .into());
        }
        let Slot::Busy(active) = &mut self.slot else {
            return Err(AutonError::from(UsageError::StaleHandle(handle.id)).into());
        };
        if active.id != handle.id {
            return Err(AutonError::from(UsageError::StaleHandle(handle.id)).into());
        }
        self.drivetrain.set_max_speed(speed).map_err(hw)?;
        tracing::info!(
            id = active.id,
            from = active.request.max_speed,
            to = speed,
            "max speed changed"
        );
        active.request.max_speed = speed;
        Ok(())
    }

    /// Stop waiting on the outstanding motion. The controller keeps chasing
    /// its target until the next submission supersedes it.
    pub fn release(&mut self, handle: MotionHandle) -> Result<()> {
        let active = self.take_active(&handle)?;
        tracing::debug!(id = active.id, motion = %active.request, "motion released");
        Ok(())
    }

    /// Zero the drivetrain's positional reference. Only allowed while idle.
    pub fn reset_sensors(&mut self) -> Result<()> {
        if let Some(kind) = self.active_kind() {
            return Err(AutonError::from(UsageError::MotionOutstanding { kind }).into());
        }
        self.drivetrain.reset_sensors().map_err(hw)?;
        Ok(())
    }

    /// Read the drivetrain's interference flag.
    pub fn interfered(&mut self) -> bool {
        self.drivetrain.interfered()
    }
}
