//! `rover-hal` – Hardware Abstraction Layer
//!
//! Drivers sit behind small traits so the control logic never touches a pin
//! or a bus register directly:
//!
//! - [`pulse`] – [`PulseOutput`][pulse::PulseOutput] for PWM/servo pulse
//!   generators, and the shared [`PulseBus`][pulse::PulseBus] handle with
//!   exactly-once teardown.
//! - [`echo`] – [`EchoPins`][echo::EchoPins], the trigger/echo lines of an
//!   ultrasonic range finder.
//! - [`camera`] / [`detector`] – frame capture and object detection seams.
//!
//! On top of those seams it builds the actuators the arbitration loop
//! commands:
//!
//! - [`motor`] – [`MotorChannel`][motor::MotorChannel], one H-bridge motor.
//! - [`drive`] – [`DriveController`][drive::DriveController], skid-steer or
//!   pivot differential drive.
//! - [`aim`] – [`AimAxis`][aim::AimAxis] and
//!   [`PanTiltController`][aim::PanTiltController], clamped servo axes with
//!   linear angle-to-pulse mapping.
//! - [`sim`] – simulated drivers for headless runs and tests.

pub mod aim;
pub mod camera;
pub mod detector;
pub mod drive;
pub mod echo;
pub mod motor;
pub mod pulse;
pub mod sim;

pub use aim::{AimAxis, Bearing, PanTiltController};
pub use camera::{Camera, CameraFrame};
pub use detector::ObjectDetector;
pub use drive::DriveController;
pub use echo::EchoPins;
pub use motor::MotorChannel;
pub use pulse::{PulseBus, PulseOutput, PulseValue};
