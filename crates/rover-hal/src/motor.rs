//! [`MotorChannel`] – one H-bridge motor driven by a forward and a reverse
//! PWM line.

use rover_types::{Direction, RoverError};
use tracing::{debug, warn};

use crate::pulse::{PulseBus, PulseValue};

/// One motor: the forward line carries the duty cycle when driving forward,
/// the reverse line when driving in reverse. The idle line is always held
/// at zero.
#[derive(Debug)]
pub struct MotorChannel {
    name: String,
    forward_channel: u8,
    reverse_channel: u8,
    bus: PulseBus,
}

impl MotorChannel {
    pub fn new(
        name: impl Into<String>,
        forward_channel: u8,
        reverse_channel: u8,
        bus: PulseBus,
    ) -> Self {
        Self {
            name: name.into(),
            forward_channel,
            reverse_channel,
            bus,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drive in `direction` at `duty_percent`.
    ///
    /// Duty outside `[0, 100]` is a caller error; it is clamped before it
    /// reaches the driver and logged.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the pulse bus rejects
    /// either write.
    pub fn drive(&mut self, direction: Direction, duty_percent: f32) -> Result<(), RoverError> {
        let duty = clamp_duty(duty_percent);
        if duty != duty_percent {
            warn!(motor = %self.name, requested = duty_percent, applied = duty, "duty out of range");
        }
        let (active, idle) = match direction {
            Direction::Forward => (self.forward_channel, self.reverse_channel),
            Direction::Reverse => (self.reverse_channel, self.forward_channel),
        };
        // Release the opposing line first so both are never high together.
        self.bus.set_pulse(idle, PulseValue::DutyPercent(0.0))?;
        self.bus.set_pulse(active, PulseValue::DutyPercent(duty))?;
        debug!(motor = %self.name, ?direction, duty, "motor drive");
        Ok(())
    }

    /// Coast: zero duty on both lines.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the pulse bus rejects
    /// either write.
    pub fn stop(&mut self) -> Result<(), RoverError> {
        self.bus.set_pulse(self.forward_channel, PulseValue::DutyPercent(0.0))?;
        self.bus.set_pulse(self.reverse_channel, PulseValue::DutyPercent(0.0))
    }
}

/// Clamp to `[0, 100]`; NaN maps to 0.
pub fn clamp_duty(duty_percent: f32) -> f32 {
    if duty_percent.is_nan() {
        0.0
    } else {
        duty_percent.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimPulseOutput;

    fn motor() -> (MotorChannel, crate::sim::PulseProbe) {
        let sim = SimPulseOutput::new("sim_pwm");
        let probe = sim.probe();
        let bus = PulseBus::new(Box::new(sim));
        (MotorChannel::new("left", 0, 1, bus), probe)
    }

    #[test]
    fn forward_drives_forward_line_only() {
        let (mut m, probe) = motor();
        m.drive(Direction::Forward, 60.0).unwrap();
        assert_eq!(probe.duty(0), Some(60.0));
        assert_eq!(probe.duty(1), Some(0.0));
    }

    #[test]
    fn reverse_drives_reverse_line_only() {
        let (mut m, probe) = motor();
        m.drive(Direction::Forward, 60.0).unwrap();
        m.drive(Direction::Reverse, 35.0).unwrap();
        assert_eq!(probe.duty(0), Some(0.0));
        assert_eq!(probe.duty(1), Some(35.0));
    }

    #[test]
    fn duty_boundaries_are_clamped_before_driver() {
        let (mut m, probe) = motor();
        for (requested, applied) in [(0.0, 0.0), (100.0, 100.0), (-5.0, 0.0), (150.0, 100.0)] {
            m.drive(Direction::Forward, requested).unwrap();
            assert_eq!(probe.duty(0), Some(applied), "requested {requested}");
        }
        m.drive(Direction::Forward, f32::NAN).unwrap();
        assert_eq!(probe.duty(0), Some(0.0));
    }

    #[test]
    fn stop_twice_matches_stop_once() {
        let (mut m, probe) = motor();
        m.drive(Direction::Reverse, 80.0).unwrap();
        m.stop().unwrap();
        let once = probe.snapshot();
        m.stop().unwrap();
        assert_eq!(probe.snapshot(), once);
        assert_eq!(probe.duty(0), Some(0.0));
        assert_eq!(probe.duty(1), Some(0.0));
    }
}
