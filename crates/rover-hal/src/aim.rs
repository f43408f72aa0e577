//! Servo aim mechanism: a bounded [`AimAxis`] per servo and the two-axis
//! [`PanTiltController`].
//!
//! # Angle-to-pulse mapping
//!
//! Each axis maps its angle linearly onto a pulse width:
//!
//! ```text
//! pulse_us = min_pulse_us + (angle - min_deg) / (max_deg - min_deg) * (max_pulse_us - min_pulse_us)
//! ```
//!
//! The mapping is evaluated in `f64` and forwarded unrounded; the driver
//! applies its own resolution. Centring accumulates many small steps, so
//! rounding here would bias the result.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::aim::PanTiltController;
//! use rover_hal::pulse::PulseBus;
//! use rover_hal::sim::SimPulseOutput;
//! use rover_types::config::AimConfig;
//! use rover_types::{AimAxisId, Nudge};
//!
//! let bus = PulseBus::new(Box::new(SimPulseOutput::new("sim")));
//! let mut aim = PanTiltController::new(&AimConfig::default(), &bus).unwrap();
//! aim.center().unwrap();
//! aim.nudge(AimAxisId::Pan, 8, Nudge::Decrease).unwrap();
//! assert_eq!(aim.current_bearing().pan, -8);
//! ```

use std::cmp::Ordering;

use rover_types::config::{AimConfig, AxisConfig};
use rover_types::{AimAxisId, Nudge, RoverError, floor_midpoint};
use tracing::debug;

use crate::pulse::{PulseBus, PulseValue};

// ────────────────────────────────────────────────────────────────────────────
// AimAxis
// ────────────────────────────────────────────────────────────────────────────

/// One servo axis. The angle never leaves `[min_degrees, max_degrees]`.
#[derive(Debug)]
pub struct AimAxis {
    id: AimAxisId,
    channel: u8,
    angle: i32,
    min_degrees: i32,
    max_degrees: i32,
    min_pulse_us: f64,
    max_pulse_us: f64,
    bus: PulseBus,
}

impl AimAxis {
    /// Create an axis parked (logically) at its centre. Nothing is written to
    /// the servo until the first command.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfiguration`] if the angle limits are
    /// inverted or the pulse range is empty.
    pub fn new(id: AimAxisId, config: &AxisConfig, bus: PulseBus) -> Result<Self, RoverError> {
        if config.min_degrees > config.max_degrees {
            return Err(RoverError::InvalidConfiguration(format!(
                "{id} axis: min_degrees {} > max_degrees {}",
                config.min_degrees, config.max_degrees
            )));
        }
        if config.min_pulse_us.partial_cmp(&config.max_pulse_us) != Some(Ordering::Less) {
            return Err(RoverError::InvalidConfiguration(format!(
                "{id} axis: empty pulse range {}..{}",
                config.min_pulse_us, config.max_pulse_us
            )));
        }
        Ok(Self {
            id,
            channel: config.channel,
            angle: floor_midpoint(config.min_degrees, config.max_degrees),
            min_degrees: config.min_degrees,
            max_degrees: config.max_degrees,
            min_pulse_us: config.min_pulse_us,
            max_pulse_us: config.max_pulse_us,
            bus,
        })
    }

    pub fn id(&self) -> AimAxisId {
        self.id
    }

    /// Current commanded angle in degrees.
    pub fn angle(&self) -> i32 {
        self.angle
    }

    pub fn limits(&self) -> (i32, i32) {
        (self.min_degrees, self.max_degrees)
    }

    /// Midpoint of the limits (floored).
    pub fn center_degrees(&self) -> i32 {
        floor_midpoint(self.min_degrees, self.max_degrees)
    }

    /// Signed distance of the current angle from the centre.
    pub fn bearing(&self) -> i32 {
        self.angle.saturating_sub(self.center_degrees())
    }

    /// Step up by `step_degrees`, stopping at the upper limit.
    pub fn increment(&mut self, step_degrees: i32) -> Result<i32, RoverError> {
        self.set_angle(self.angle.saturating_add(step_degrees))
    }

    /// Step down by `step_degrees`, stopping at the lower limit.
    pub fn decrement(&mut self, step_degrees: i32) -> Result<i32, RoverError> {
        self.set_angle(self.angle.saturating_sub(step_degrees))
    }

    /// Clamp `degrees` to the limits and command the servo there.
    ///
    /// Returns the applied angle.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the pulse write fails;
    /// the stored angle is left unchanged in that case.
    pub fn set_angle(&mut self, degrees: i32) -> Result<i32, RoverError> {
        let target = degrees.clamp(self.min_degrees, self.max_degrees);
        let pulse = self.pulse_width_us(target);
        self.bus
            .set_pulse(self.channel, PulseValue::WidthMicros(pulse))?;
        debug!(axis = %self.id, angle = target, pulse_us = pulse, "aim");
        self.angle = target;
        Ok(target)
    }

    /// Pulse width for `degrees`, which must already be within limits.
    pub fn pulse_width_us(&self, degrees: i32) -> f64 {
        let span_deg = f64::from(self.max_degrees) - f64::from(self.min_degrees);
        if span_deg == 0.0 {
            return self.min_pulse_us;
        }
        let fraction = (f64::from(degrees) - f64::from(self.min_degrees)) / span_deg;
        self.min_pulse_us + fraction * (self.max_pulse_us - self.min_pulse_us)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PanTiltController
// ────────────────────────────────────────────────────────────────────────────

/// Current bearing of both axes, in degrees from centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bearing {
    pub pan: i32,
    pub tilt: i32,
}

/// Two-axis camera mount.
#[derive(Debug)]
pub struct PanTiltController {
    pan: AimAxis,
    tilt: AimAxis,
}

impl PanTiltController {
    /// Build both axes on `bus`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfiguration`] if either axis is
    /// misconfigured.
    pub fn new(config: &AimConfig, bus: &PulseBus) -> Result<Self, RoverError> {
        Ok(Self {
            pan: AimAxis::new(AimAxisId::Pan, &config.pan, bus.clone())?,
            tilt: AimAxis::new(AimAxisId::Tilt, &config.tilt, bus.clone())?,
        })
    }

    pub fn axis(&self, id: AimAxisId) -> &AimAxis {
        match id {
            AimAxisId::Pan => &self.pan,
            AimAxisId::Tilt => &self.tilt,
        }
    }

    fn axis_mut(&mut self, id: AimAxisId) -> &mut AimAxis {
        match id {
            AimAxisId::Pan => &mut self.pan,
            AimAxisId::Tilt => &mut self.tilt,
        }
    }

    /// Command both axes to the midpoint of their limits.
    pub fn center(&mut self) -> Result<(), RoverError> {
        let pan_center = self.pan.center_degrees();
        let tilt_center = self.tilt.center_degrees();
        self.pan.set_angle(pan_center)?;
        self.tilt.set_angle(tilt_center)?;
        Ok(())
    }

    /// Step one axis by `step_degrees` in the given sense. Returns the new
    /// angle.
    pub fn nudge(&mut self, axis: AimAxisId, step_degrees: i32, sense: Nudge) -> Result<i32, RoverError> {
        let axis = self.axis_mut(axis);
        match sense {
            Nudge::Increase => axis.increment(step_degrees),
            Nudge::Decrease => axis.decrement(step_degrees),
        }
    }

    pub fn set_angle(&mut self, axis: AimAxisId, degrees: i32) -> Result<i32, RoverError> {
        self.axis_mut(axis).set_angle(degrees)
    }

    pub fn current_bearing(&self) -> Bearing {
        Bearing {
            pan: self.pan.bearing(),
            tilt: self.tilt.bearing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{PulseProbe, SimPulseOutput};

    fn axis(min: i32, max: i32) -> (AimAxis, PulseProbe) {
        let sim = SimPulseOutput::new("sim_servo");
        let probe = sim.probe();
        let bus = PulseBus::new(Box::new(sim));
        let config = AxisConfig {
            channel: 7,
            min_degrees: min,
            max_degrees: max,
            ..AxisConfig::default()
        };
        (AimAxis::new(AimAxisId::Pan, &config, bus).unwrap(), probe)
    }

    #[test]
    fn repeated_increments_stop_at_max() {
        let (mut a, _) = axis(0, 180);
        for _ in 0..50 {
            let angle = a.increment(7).unwrap();
            assert!((0..=180).contains(&angle));
        }
        assert_eq!(a.angle(), 180);
    }

    #[test]
    fn repeated_decrements_stop_at_min() {
        let (mut a, _) = axis(30, 150);
        for _ in 0..50 {
            a.decrement(9).unwrap();
            assert!(a.angle() >= 30);
        }
        assert_eq!(a.angle(), 30);
    }

    #[test]
    fn set_angle_clamps_both_ways() {
        let (mut a, _) = axis(10, 170);
        assert_eq!(a.set_angle(-40).unwrap(), 10);
        assert_eq!(a.set_angle(500).unwrap(), 170);
        assert_eq!(a.set_angle(i32::MIN).unwrap(), 10);
        assert_eq!(a.increment(i32::MAX).unwrap(), 170);
    }

    #[test]
    fn negative_step_still_respects_limits() {
        let (mut a, _) = axis(0, 180);
        a.set_angle(5).unwrap();
        assert_eq!(a.increment(-20).unwrap(), 0);
    }

    #[test]
    fn pulse_mapping_is_linear_and_exact() {
        let (mut a, probe) = axis(0, 180);
        assert_eq!(a.pulse_width_us(0), 500.0);
        assert_eq!(a.pulse_width_us(180), 2500.0);
        assert_eq!(a.pulse_width_us(90), 1500.0);
        a.set_angle(1).unwrap();
        let expected = 500.0 + 2000.0 / 180.0;
        let written = probe.width(7).unwrap();
        assert!((written - expected).abs() < 1e-9, "got {written}");
    }

    #[test]
    fn degenerate_range_maps_to_min_pulse() {
        let (a, _) = axis(90, 90);
        assert_eq!(a.pulse_width_us(90), 500.0);
        assert_eq!(a.center_degrees(), 90);
    }

    #[test]
    fn inverted_limits_are_rejected() {
        let bus = PulseBus::new(Box::new(SimPulseOutput::new("sim")));
        let config = AxisConfig {
            min_degrees: 100,
            max_degrees: 20,
            ..AxisConfig::default()
        };
        let err = AimAxis::new(AimAxisId::Tilt, &config, bus).unwrap_err();
        assert!(matches!(err, RoverError::InvalidConfiguration(_)));
    }

    #[test]
    fn nan_or_empty_pulse_range_is_rejected() {
        for (min, max) in [(f64::NAN, 2500.0), (500.0, f64::NAN), (1500.0, 1500.0)] {
            let bus = PulseBus::new(Box::new(SimPulseOutput::new("sim")));
            let config = AxisConfig {
                min_pulse_us: min,
                max_pulse_us: max,
                ..AxisConfig::default()
            };
            assert!(
                AimAxis::new(AimAxisId::Pan, &config, bus).is_err(),
                "{min}..{max} accepted"
            );
        }
    }

    #[test]
    fn full_width_limits_do_not_overflow() {
        let (mut a, _) = axis(i32::MIN, i32::MAX);
        assert_eq!(a.center_degrees(), -1);
        assert_eq!(a.angle(), -1);
        assert_eq!(a.set_angle(i32::MAX).unwrap(), i32::MAX);
        assert_eq!(a.bearing(), i32::MAX);
        assert_eq!(a.pulse_width_us(i32::MAX), 2500.0);
        assert_eq!(a.pulse_width_us(i32::MIN), 500.0);
    }

    #[test]
    fn center_then_nudge_updates_bearing() {
        let sim = SimPulseOutput::new("sim");
        let probe = sim.probe();
        let bus = PulseBus::new(Box::new(sim));
        let mut aim = PanTiltController::new(&AimConfig::default(), &bus).unwrap();
        aim.center().unwrap();
        assert_eq!(aim.current_bearing(), Bearing { pan: 0, tilt: 0 });
        assert_eq!(probe.width(4), Some(1500.0));
        assert_eq!(probe.width(5), Some(1500.0));

        aim.nudge(AimAxisId::Pan, 8, Nudge::Decrease).unwrap();
        aim.nudge(AimAxisId::Tilt, 3, Nudge::Increase).unwrap();
        assert_eq!(aim.axis(AimAxisId::Pan).angle(), 82);
        assert_eq!(aim.current_bearing(), Bearing { pan: -8, tilt: 3 });
    }

    #[test]
    fn failed_write_leaves_angle_unchanged() {
        let sim = SimPulseOutput::new("flaky").fail_after(2);
        let bus = PulseBus::new(Box::new(sim));
        let mut aim = PanTiltController::new(&AimConfig::default(), &bus).unwrap();
        aim.center().unwrap();
        assert!(aim.nudge(AimAxisId::Pan, 5, Nudge::Increase).is_err());
        assert_eq!(aim.axis(AimAxisId::Pan).angle(), 90);
    }
}
