//! `EchoPins` trait for trigger/echo ultrasonic range finders (HC-SR04 and
//! compatibles).
//!
//! The driver exposes only the two digital lines; timing and distance
//! conversion live in the range monitor.

use rover_types::RoverError;

/// Trigger output and echo input of an ultrasonic range finder.
pub trait EchoPins: Send {
    /// Stable identifier, e.g. `"front_sonar"`.
    fn id(&self) -> &str;

    /// Drive the trigger line.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::SensorTimeout`] or
    /// [`RoverError::ActuatorUnavailable`] if the line cannot be written.
    fn set_trigger(&mut self, high: bool) -> Result<(), RoverError>;

    /// Sample the echo line.
    fn echo_is_high(&mut self) -> Result<bool, RoverError>;
}
