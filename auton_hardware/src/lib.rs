//! Simulated robot hardware behind the `auton_traits` interfaces.

pub mod actuators;
pub mod drivetrain;
pub mod error;

pub use actuators::{LIFT_TRAVEL, SimulatedLift, SimulatedPiston, SimulatedRoller};
pub use drivetrain::{Applied, DriveModel, Pose, SimulatedDrivetrain};
pub use error::HwError;

#[cfg(test)]
mod tests {
    use super::*;
    use auton_traits::{Lift, Piston, Roller};

    #[test]
    fn simulated_piston_shares_state_with_clones() {
        let handle = SimulatedPiston::new("clamp");
        let mut boxed: Box<dyn Piston> = Box::new(handle.clone());
        boxed.set_value(true).unwrap();
        assert!(handle.is_extended());
    }

    #[test]
    fn roller_power_is_bounded() {
        let mut r = SimulatedRoller::new("intake");
        r.move_power(-127).unwrap();
        assert_eq!(r.power(), -127);
        let err = r.move_power(128).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HwError>(),
            Some(HwError::OutOfRange { what: "roller power", .. })
        ));
        assert_eq!(r.power(), -127);
    }

    #[test]
    fn unplugged_roller_reports_disconnect() {
        let mut r = SimulatedRoller::unplugged("intake");
        let err = r.move_power(127).unwrap_err();
        assert_eq!(err.to_string(), "intake disconnected");
    }

    #[test]
    fn lift_rejects_positions_past_travel() {
        let mut lift = SimulatedLift::new();
        lift.move_absolute(1875.0, 127).unwrap();
        assert_eq!(lift.position(), 1875.0);
        assert!(lift.move_absolute(LIFT_TRAVEL + 1.0, 127).is_err());
        assert!(lift.move_absolute(100.0, 0).is_err());
        assert_eq!(lift.position(), 1875.0);
    }
}
