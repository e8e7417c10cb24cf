//! Simulated pneumatics, rollers and lift.
//!
//! Clones share their state, so a caller can keep a handle for inspection
//! after boxing the device into the engine.

use std::cell::Cell;
use std::rc::Rc;

use auton_traits::{HwResult, Lift, Piston, Roller};

use crate::error::HwError;

/// Lift encoder travel, in degrees of the lift motor.
pub const LIFT_TRAVEL: f64 = 2_000.0;

#[derive(Debug, Clone)]
pub struct SimulatedPiston {
    name: &'static str,
    extended: Rc<Cell<bool>>,
}

impl SimulatedPiston {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            extended: Rc::new(Cell::new(false)),
        }
    }

    pub fn is_extended(&self) -> bool {
        self.extended.get()
    }
}

impl Piston for SimulatedPiston {
    fn set_value(&mut self, extended: bool) -> HwResult<()> {
        self.extended.set(extended);
        tracing::debug!(piston = self.name, extended, "piston set (simulated)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedRoller {
    name: &'static str,
    power: Rc<Cell<i32>>,
    connected: bool,
}

impl SimulatedRoller {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            power: Rc::new(Cell::new(0)),
            connected: true,
        }
    }

    /// Every command fails as if the motor cable were pulled.
    pub fn unplugged(name: &'static str) -> Self {
        Self {
            connected: false,
            ..Self::new(name)
        }
    }

    pub fn power(&self) -> i32 {
        self.power.get()
    }
}

impl Roller for SimulatedRoller {
    fn move_power(&mut self, power: i32) -> HwResult<()> {
        if !self.connected {
            return Err(HwError::Disconnected(self.name).into());
        }
        if !(-127..=127).contains(&power) {
            return Err(HwError::OutOfRange {
                what: "roller power",
                value: f64::from(power),
            }
            .into());
        }
        self.power.set(power);
        tracing::debug!(roller = self.name, power, "roller power (simulated)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedLift {
    position: Rc<Cell<f64>>,
}

impl Default for SimulatedLift {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedLift {
    pub fn new() -> Self {
        Self {
            position: Rc::new(Cell::new(0.0)),
        }
    }

    /// Last commanded position. The simulated lift reaches it immediately.
    pub fn position(&self) -> f64 {
        self.position.get()
    }
}

impl Lift for SimulatedLift {
    fn move_absolute(&mut self, position: f64, speed: i32) -> HwResult<()> {
        if !(0.0..=LIFT_TRAVEL).contains(&position) {
            return Err(HwError::OutOfRange {
                what: "lift position",
                value: position,
            }
            .into());
        }
        if !(1..=127).contains(&speed) {
            return Err(HwError::OutOfRange {
                what: "lift speed",
                value: f64::from(speed),
            }
            .into());
        }
        self.position.set(position);
        tracing::debug!(position, speed, "lift move (simulated)");
        Ok(())
    }
}
