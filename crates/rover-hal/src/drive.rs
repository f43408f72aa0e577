//! [`DriveController`] – differential drive composed of two
//! [`MotorChannel`]s.
//!
//! # Turning
//!
//! [`TurnMode::SkidSteer`] spins the wheel sets in opposite directions for the
//! tightest radius. [`TurnMode::Pivot`] stops the inner wheel and drives the
//! outer one forward. Both share one code path, selected at construction.

use rover_types::config::{DriveConfig, TurnMode};
use rover_types::{Direction, DriveCommand, RoverError};
use tracing::debug;

use crate::motor::MotorChannel;
use crate::pulse::PulseBus;

/// Maximum drive speed, in percent.
pub const MAX_SPEED: u8 = 100;

/// Two-motor differential drive. Stateless beyond its wiring, so repeating a
/// command reproduces the same outputs.
#[derive(Debug)]
pub struct DriveController {
    left: MotorChannel,
    right: MotorChannel,
    turn_mode: TurnMode,
}

impl DriveController {
    pub fn new(left: MotorChannel, right: MotorChannel, turn_mode: TurnMode) -> Self {
        Self {
            left,
            right,
            turn_mode,
        }
    }

    /// Build both motors from `config` on `bus`.
    pub fn from_config(config: &DriveConfig, bus: &PulseBus) -> Self {
        Self::new(
            MotorChannel::new(
                "left",
                config.left_forward_channel,
                config.left_reverse_channel,
                bus.clone(),
            ),
            MotorChannel::new(
                "right",
                config.right_forward_channel,
                config.right_reverse_channel,
                bus.clone(),
            ),
            config.turn_mode,
        )
    }

    pub fn turn_mode(&self) -> TurnMode {
        self.turn_mode
    }

    /// Execute a [`DriveCommand`].
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if any motor write fails.
    pub fn apply(&mut self, command: DriveCommand) -> Result<(), RoverError> {
        debug!(%command, "drive command");
        match command {
            DriveCommand::Forward(speed) => self.move_forward(speed),
            DriveCommand::Backward(speed) => self.move_backward(speed),
            DriveCommand::TurnLeft(speed) => self.turn_left(speed),
            DriveCommand::TurnRight(speed) => self.turn_right(speed),
            DriveCommand::Stop => self.stop(),
        }
    }

    pub fn move_forward(&mut self, speed: u8) -> Result<(), RoverError> {
        let duty = duty(speed);
        self.left.drive(Direction::Forward, duty)?;
        self.right.drive(Direction::Forward, duty)
    }

    pub fn move_backward(&mut self, speed: u8) -> Result<(), RoverError> {
        let duty = duty(speed);
        self.left.drive(Direction::Reverse, duty)?;
        self.right.drive(Direction::Reverse, duty)
    }

    /// Turn counter-clockwise; the left wheel set is the inner one.
    pub fn turn_left(&mut self, speed: u8) -> Result<(), RoverError> {
        let duty = duty(speed);
        match self.turn_mode {
            TurnMode::SkidSteer => self.left.drive(Direction::Reverse, duty)?,
            TurnMode::Pivot => self.left.stop()?,
        }
        self.right.drive(Direction::Forward, duty)
    }

    /// Turn clockwise; the right wheel set is the inner one.
    pub fn turn_right(&mut self, speed: u8) -> Result<(), RoverError> {
        let duty = duty(speed);
        self.left.drive(Direction::Forward, duty)?;
        match self.turn_mode {
            TurnMode::SkidSteer => self.right.drive(Direction::Reverse, duty),
            TurnMode::Pivot => self.right.stop(),
        }
    }

    pub fn stop(&mut self) -> Result<(), RoverError> {
        self.left.stop()?;
        self.right.stop()
    }
}

fn duty(speed: u8) -> f32 {
    f32::from(speed.min(MAX_SPEED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PulseProbe, SimPulseOutput};

    // Channels: left fwd 0 / rev 1, right fwd 2 / rev 3.
    fn controller(mode: TurnMode) -> (DriveController, PulseProbe) {
        let sim = SimPulseOutput::new("sim_pwm");
        let probe = sim.probe();
        let bus = PulseBus::new(Box::new(sim));
        let config = DriveConfig {
            turn_mode: mode,
            ..DriveConfig::default()
        };
        (DriveController::from_config(&config, &bus), probe)
    }

    fn duties(probe: &PulseProbe) -> [Option<f32>; 4] {
        [probe.duty(0), probe.duty(1), probe.duty(2), probe.duty(3)]
    }

    #[test]
    fn forward_and_backward_drive_both_wheels() {
        let (mut drive, probe) = controller(TurnMode::SkidSteer);
        drive.move_forward(50).unwrap();
        assert_eq!(duties(&probe), [Some(50.0), Some(0.0), Some(50.0), Some(0.0)]);
        drive.move_backward(40).unwrap();
        assert_eq!(duties(&probe), [Some(0.0), Some(40.0), Some(0.0), Some(40.0)]);
    }

    #[test]
    fn skid_steer_turns_spin_wheels_in_opposite_directions() {
        let (mut drive, probe) = controller(TurnMode::SkidSteer);
        drive.turn_left(30).unwrap();
        assert_eq!(duties(&probe), [Some(0.0), Some(30.0), Some(30.0), Some(0.0)]);
        drive.turn_right(30).unwrap();
        assert_eq!(duties(&probe), [Some(30.0), Some(0.0), Some(0.0), Some(30.0)]);
    }

    #[test]
    fn pivot_turns_stop_inner_wheel() {
        let (mut drive, probe) = controller(TurnMode::Pivot);
        drive.turn_left(30).unwrap();
        assert_eq!(duties(&probe), [Some(0.0), Some(0.0), Some(30.0), Some(0.0)]);
        drive.turn_right(30).unwrap();
        assert_eq!(duties(&probe), [Some(30.0), Some(0.0), Some(0.0), Some(0.0)]);
    }

    #[test]
    fn speed_above_hundred_is_clamped() {
        let (mut drive, probe) = controller(TurnMode::SkidSteer);
        drive.apply(DriveCommand::Forward(250)).unwrap();
        assert_eq!(probe.duty(0), Some(100.0));
        assert_eq!(probe.duty(2), Some(100.0));
    }

    #[test]
    fn repeated_commands_are_idempotent() {
        let (mut drive, probe) = controller(TurnMode::SkidSteer);
        drive.apply(DriveCommand::TurnRight(45)).unwrap();
        let once = probe.snapshot();
        drive.apply(DriveCommand::TurnRight(45)).unwrap();
        assert_eq!(probe.snapshot(), once);

        drive.stop().unwrap();
        let stopped = probe.snapshot();
        drive.stop().unwrap();
        assert_eq!(probe.snapshot(), stopped);
        assert_eq!(duties(&probe), [Some(0.0); 4]);
    }

    #[test]
    fn failing_bus_surfaces_actuator_error() {
        let sim = SimPulseOutput::new("flaky").fail_after(1);
        let bus = PulseBus::new(Box::new(sim));
        let mut drive = DriveController::from_config(&DriveConfig::default(), &bus);
        let err = drive.move_forward(50).unwrap_err();
        assert!(err.is_fatal());
    }
}
