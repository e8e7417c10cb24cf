//! Authored autonomous routines.
//!
//! The tuning examples exercise one feature each; the match routines are the
//! competition programs for each starting tile. "Set motion, delay, act"
//! sequences become a `launch` followed by the delayed steps, then either a
//! `wait` or a `release` when the next motion takes over mid-flight.

use auton_traits::SwingSide;

use crate::error::{AutonError, Result, ScriptError, UsageError};
use crate::motion::{MotionRequest, WaitMode};
use crate::script::{RoutineScript, ScriptBuilder};

/// Default motion speeds on the 0..=127 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Speeds {
    pub drive: f64,
    pub turn: f64,
    pub swing: f64,
}

impl Default for Speeds {
    fn default() -> Self {
        Self {
            drive: 110.0,
            turn: 90.0,
            swing: 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutineParams {
    pub speeds: Speeds,
    /// Attempt budget for retry blocks.
    pub retry_attempts: u32,
}

impl Default for RoutineParams {
    fn default() -> Self {
        Self {
            speeds: Speeds::default(),
            retry_attempts: 3,
        }
    }
}

type BuildFn = fn(&RoutineParams) -> std::result::Result<RoutineScript, ScriptError>;

#[derive(Debug, Clone, Copy)]
pub struct RoutineInfo {
    pub name: &'static str,
    pub summary: &'static str,
    build: BuildFn,
}

impl RoutineInfo {
    pub fn build(&self, params: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
        (self.build)(params)
    }
}

static CATALOG: [RoutineInfo; 15] = [
    RoutineInfo {
        name: "drive_example",
        summary: "slewed drive forward, then back in two legs",
        build: drive_example,
    },
    RoutineInfo {
        name: "turn_example",
        summary: "turn to 90, 45 and back to 0 degrees",
        build: turn_example,
    },
    RoutineInfo {
        name: "drive_and_turn",
        summary: "drive out, turn both ways, drive back",
        build: drive_and_turn,
    },
    RoutineInfo {
        name: "wait_until_change_speed",
        summary: "creep the first 6 in at speed 30, then finish at full speed",
        build: wait_until_change_speed,
    },
    RoutineInfo {
        name: "swing_example",
        summary: "four wide swings about alternating sides",
        build: swing_example,
    },
    RoutineInfo {
        name: "motion_chaining",
        summary: "quick-chained turns ending in a settled turn",
        build: motion_chaining,
    },
    RoutineInfo {
        name: "combining_movements",
        summary: "drive, turn, swing, turn, drive",
        build: combining_movements,
    },
    RoutineInfo {
        name: "interfered_example",
        summary: "drive with interference recovery, then turn",
        build: interfered_example,
    },
    RoutineInfo {
        name: "blue_left",
        summary: "blue left tile: goal rush, single stack, reverse stack, ladder",
        build: blue_left,
    },
    RoutineInfo {
        name: "blue_right",
        summary: "blue right tile: goal, ring stacks, ladder",
        build: blue_right,
    },
    RoutineInfo {
        name: "red_left",
        summary: "red left tile: goal, ring stacks, ladder",
        build: red_left,
    },
    RoutineInfo {
        name: "red_right",
        summary: "red right tile: goal rush, single stack, reverse stack, ladder",
        build: red_right,
    },
    RoutineInfo {
        name: "red_elim_positive",
        summary: "red positive corner elimination",
        build: red_elim_positive,
    },
    RoutineInfo {
        name: "blue_elim_positive",
        summary: "blue positive corner elimination",
        build: blue_elim_positive,
    },
    RoutineInfo {
        name: "blue_elim_negative",
        summary: "blue negative side elimination",
        build: blue_elim_negative,
    },
];

pub fn catalog() -> &'static [RoutineInfo] {
    &CATALOG
}

/// Build the routine called `name`.
pub fn by_name(name: &str, params: &RoutineParams) -> Result<RoutineScript> {
    let info = CATALOG
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| AutonError::from(UsageError::UnknownRoutine(name.to_owned())))?;
    info.build(params)
        .map_err(|e| AutonError::from(e).into())
}

// ── Tuning examples ──────────────────────────────────────────────────────────

fn drive_example(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let d = p.speeds.drive;
    RoutineScript::builder("drive_example")
        .drive_slew(24.0, d)
        .drive(-12.0, d)
        .drive(-12.0, d)
        .build()
}

fn turn_example(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let t = p.speeds.turn;
    RoutineScript::builder("turn_example")
        .turn(90.0, t)
        .turn(45.0, t)
        .turn(0.0, t)
        .build()
}

fn drive_and_turn(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    RoutineScript::builder("drive_and_turn")
        .drive_slew(24.0, d)
        .turn(45.0, t)
        .turn(-45.0, t)
        .turn(0.0, t)
        .drive_slew(-24.0, d)
        .build()
}

fn wait_until_change_speed(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    RoutineScript::builder("wait_until_change_speed")
        .launch(MotionRequest::drive_slew(24.0, 30.0))
        .wait_until(6.0)
        .set_max_speed(d)
        .wait(WaitMode::Blocking)
        .turn(45.0, t)
        .turn(-45.0, t)
        .turn(0.0, t)
        .launch(MotionRequest::drive_slew(-24.0, 30.0))
        .wait_until(-6.0)
        .set_max_speed(d)
        .wait(WaitMode::Blocking)
        .build()
}

fn swing_example(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let s = p.speeds.swing;
    RoutineScript::builder("swing_example")
        .swing(SwingSide::Left, 45.0, s, 45.0)
        .swing(SwingSide::Right, 0.0, s, 45.0)
        .swing(SwingSide::Right, 45.0, s, 45.0)
        .swing(SwingSide::Left, 0.0, s, 45.0)
        .build()
}

fn motion_chaining(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    RoutineScript::builder("motion_chaining")
        .drive_slew(24.0, d)
        .motion(MotionRequest::turn(45.0, t), WaitMode::QuickChain)
        .motion(MotionRequest::turn(-45.0, t), WaitMode::QuickChain)
        .turn(0.0, t)
        .drive_slew(-24.0, d)
        .build()
}

fn combining_movements(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds {
        drive: d,
        turn: t,
        swing: s,
    } = p.speeds;
    RoutineScript::builder("combining_movements")
        .drive_slew(24.0, d)
        .turn(45.0, t)
        .swing(SwingSide::Right, -45.0, s, 45.0)
        .turn(0.0, t)
        .drive_slew(-24.0, d)
        .build()
}

fn interfered_example(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    RoutineScript::builder("interfered_example")
        .retry(MotionRequest::drive_slew(24.0, p.speeds.drive), p.retry_attempts)
        .turn(90.0, p.speeds.turn)
        .build()
}

// ── Match routines ───────────────────────────────────────────────────────────

/// Goal rush side. `mirror` is +1 for blue left and -1 for red right.
fn goal_rush_opening(name: &str, p: &RoutineParams, mirror: f64) -> ScriptBuilder {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    RoutineScript::builder(name)
        .unclamp()
        .intake_down()
        .drive(-14.5, d)
        .turn(30.0 * mirror, t)
        .drive(-10.0, d)
        // slow approach, clamp while still rolling onto the goal
        .launch(MotionRequest::drive(-14.0, 40.0))
        .delay_ms(1100)
        .clamp()
        .delay_ms(300)
        .release()
        // score the preload on the way to the single stack
        .launch(MotionRequest::turn(90.0 * mirror, t))
        .delay_ms(400)
        .intake_on()
        .delay_ms(200)
        .release()
        .drive(26.0, d)
        .delay_ms(1000)
        // back to the goal position, then the top ring of the reverse stack
        .drive(-26.0, d)
        .launch(MotionRequest::turn(-45.0 * mirror, t))
        .delay_ms(400)
        .intake_up()
        .delay_ms(200)
        .release()
        .drive(35.0, d)
        .delay_ms(500)
}

fn blue_left(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    ladder_finish(goal_rush_opening("blue_left", p, 1.0), p, 1.0).build()
}

fn red_right(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    ladder_finish(goal_rush_opening("red_right", p, -1.0), p, -1.0).build()
}

/// Back off, face the ladder with the lift raised and touch it.
fn ladder_finish(b: ScriptBuilder, p: &RoutineParams, mirror: f64) -> ScriptBuilder {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    b.launch(MotionRequest::drive(-35.0, d))
        .delay_ms(400)
        .intake_down()
        .wait(WaitMode::Blocking)
        .launch(MotionRequest::turn(45.0 * mirror, t))
        .delay_ms(1200)
        .lift_ladder()
        .delay_ms(250)
        .release()
        .drive(-25.0, d)
}

/// Ring side. `mirror` is +1 for blue right and -1 for red left.
fn ring_side(name: &str, p: &RoutineParams, mirror: f64) -> ScriptBuilder {
    let Speeds {
        drive: d,
        turn: t,
        swing: s,
    } = p.speeds;
    // the two sides were tuned separately; these headings are not exact mirrors
    let (far_turn, side) = if mirror > 0.0 {
        (-181.0, SwingSide::Right)
    } else {
        (179.0, SwingSide::Left)
    };
    RoutineScript::builder(name)
        .unclamp()
        .intake_down()
        .drive(-9.0, d)
        .turn(-30.0 * mirror, t)
        .drive(-17.0, d)
        .launch(MotionRequest::drive(-8.0, 40.0))
        .delay_ms(400)
        .clamp()
        .wait(WaitMode::Blocking)
        .delay_ms(500)
        // single stack, then the pair of stacks
        .launch(MotionRequest::turn(-95.0 * mirror, 70.0))
        .intake_on()
        .delay_ms(200)
        .release()
        .launch(MotionRequest::drive(19.0, d))
        .delay_ms(1250)
        .release()
        .launch(MotionRequest::turn(far_turn, t))
        .delay_ms(600)
        .release()
        .drive(16.0, d)
        .delay_ms(500)
        .launch(MotionRequest::drive(-6.0, d))
        .delay_ms(550)
        .release()
        .launch(MotionRequest::turn_relative(24.5 * mirror, t))
        .delay_ms(400)
        .release()
        .drive(9.5, d)
        .delay_ms(1000)
        // ladder
        .launch(MotionRequest::drive(-12.0, d))
        .delay_ms(550)
        .release()
        .swing(side, -65.0 * mirror, s, -30.0)
        .lift_ladder()
}

fn blue_right(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    ring_side("blue_right", p, 1.0)
        .delay_ms(300)
        .drive(-26.0, p.speeds.drive)
        .build()
}

fn red_left(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    // ends touching the ladder without waiting for the drive to settle
    ring_side("red_left", p, -1.0)
        .launch(MotionRequest::drive(-26.0, p.speeds.drive))
        .build()
}

fn blue_elim_negative(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    ring_side("blue_elim_negative", p, 1.0)
        .delay_ms(300)
        .drive(-26.0, p.speeds.drive)
        .build()
}

fn red_elim_positive(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds {
        drive: d,
        turn: t,
        swing: s,
    } = p.speeds;
    RoutineScript::builder("red_elim_positive")
        .unclamp()
        .intake_down()
        .drive(-18.0, d)
        .turn(-30.0, t)
        .launch(MotionRequest::drive(-9.0, 60.0))
        .delay_ms(700)
        .clamp()
        .delay_ms(300)
        .release()
        .launch(MotionRequest::turn(-90.0, t))
        .delay_ms(400)
        .intake_on()
        .delay_ms(200)
        .release()
        .drive(26.0, d)
        .delay_ms(1000)
        .drive(-26.0, d)
        .launch(MotionRequest::turn(45.0, t))
        .delay_ms(400)
        .intake_up()
        .delay_ms(200)
        .release()
        .drive(35.0, d)
        .delay_ms(500)
        .launch(MotionRequest::drive(-10.0, d))
        .delay_ms(400)
        .intake_down()
        .wait(WaitMode::Blocking)
        .swing(SwingSide::Right, -45.0, s, 0.0)
        .drive(58.0, d)
        // sweep the corner and drop the goal in it
        .doinker_down()
        .delay_ms(300)
        .turn(-225.0, t)
        .launch(MotionRequest::drive(-15.0, d))
        .delay_ms(600)
        .unclamp()
        .wait(WaitMode::Blocking)
        .build()
}

fn blue_elim_positive(p: &RoutineParams) -> std::result::Result<RoutineScript, ScriptError> {
    let Speeds { drive: d, turn: t, .. } = p.speeds;
    goal_rush_opening("blue_elim_positive", p, 1.0)
        .launch(MotionRequest::drive(-35.0, d))
        .delay_ms(400)
        .intake_down()
        .wait(WaitMode::Blocking)
        .launch(MotionRequest::turn(45.0, t))
        .delay_ms(500)
        .release()
        .drive(70.0, d)
        // sweep the corner, drop the goal, get out of the way
        .doinker_down()
        .delay_ms(200)
        .launch(MotionRequest::turn(225.0, t))
        .delay_ms(800)
        .unclamp()
        .delay_ms(200)
        .release()
        .drive(10.0, d)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Step;

    #[test]
    fn every_catalog_entry_builds() {
        let params = RoutineParams::default();
        for info in catalog() {
            let script = info.build(&params).unwrap();
            assert_eq!(script.name(), info.name);
            assert!(!script.steps().is_empty(), "{} is empty", info.name);
        }
    }

    #[test]
    fn unknown_name_is_a_usage_error() {
        let err = by_name("skills", &RoutineParams::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AutonError>(),
            Some(AutonError::Usage(UsageError::UnknownRoutine(n))) if n == "skills"
        ));
    }

    #[test]
    fn speeds_come_from_params() {
        let params = RoutineParams {
            speeds: Speeds {
                drive: 60.0,
                turn: 50.0,
                swing: 40.0,
            },
            retry_attempts: 3,
        };
        let script = by_name("turn_example", &params).unwrap();
        assert!(script.steps().iter().all(|s| matches!(
            s,
            Step::Motion(req, WaitMode::Blocking) if req.max_speed == 50.0
        )));
    }

    #[test]
    fn invalid_speed_fails_the_build() {
        let params = RoutineParams {
            speeds: Speeds {
                drive: 0.0,
                ..Speeds::default()
            },
            retry_attempts: 3,
        };
        assert!(by_name("drive_example", &params).is_err());
    }

    #[test]
    fn interference_example_uses_the_retry_budget() {
        let params = RoutineParams {
            retry_attempts: 5,
            ..RoutineParams::default()
        };
        let script = by_name("interfered_example", &params).unwrap();
        assert!(matches!(
            script.steps()[0],
            Step::Retry {
                max_attempts: 5,
                ..
            }
        ));
    }
}
