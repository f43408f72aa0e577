//! [`RangeMonitor`] – bounded-latency ultrasonic ranging.
//!
//! One measurement:
//!
//! 1. Pulse the trigger line high for the configured width (10 µs default).
//! 2. Wait for the echo line to rise, then for it to fall, timing the high
//!    phase.
//! 3. Convert: `distance_cm = pulse_seconds * 17150`, rounded to 2 decimals.
//!
//! Each wait carries its own deadline. A missing echo or an echo that never
//! ends yields an invalid [`DistanceSample`] instead of hanging the caller.

use std::time::{Duration, Instant};

use rover_hal::echo::EchoPins;
use rover_types::config::RangeConfig;
use rover_types::{DistanceSample, HALF_SPEED_OF_SOUND_CM_PER_S, RoverError};
use tracing::debug;

/// A range sensor driver: one bounded call per sample.
pub trait RangeSensor: Send {
    /// Take one sample. Must return within the driver's timeout; failures
    /// come back as [`DistanceSample::unknown`].
    fn measure(&mut self) -> DistanceSample;
}

/// Convert an echo pulse width into centimetres, rounded to 2 decimals.
pub fn distance_from_pulse(pulse: Duration) -> f32 {
    let cm = pulse.as_secs_f64() * HALF_SPEED_OF_SOUND_CM_PER_S;
    ((cm * 100.0).round() / 100.0) as f32
}

/// Trigger/echo range finder with per-phase timeouts.
pub struct RangeMonitor {
    pins: Box<dyn EchoPins>,
    echo_timeout: Duration,
    trigger_pulse: Duration,
}

impl RangeMonitor {
    pub fn new(pins: Box<dyn EchoPins>, config: &RangeConfig) -> Self {
        Self {
            pins,
            echo_timeout: config.echo_timeout(),
            trigger_pulse: config.trigger_pulse(),
        }
    }

    /// Take one measurement, reporting why it failed.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::SensorTimeout`] when either echo phase exceeds
    /// its deadline, or whatever the pin driver reports.
    pub fn try_measure(&mut self) -> Result<f32, RoverError> {
        self.pins.set_trigger(true)?;
        std::thread::sleep(self.trigger_pulse);
        self.pins.set_trigger(false)?;

        let rise_deadline = Instant::now() + self.echo_timeout;
        let pulse_start = self.wait_for_echo(true, rise_deadline, "rise")?;
        let fall_deadline = pulse_start + self.echo_timeout;
        let pulse_end = self.wait_for_echo(false, fall_deadline, "fall")?;

        Ok(distance_from_pulse(pulse_end - pulse_start))
    }

    /// Poll until the echo line reaches `level`, returning when it did.
    fn wait_for_echo(
        &mut self,
        level: bool,
        deadline: Instant,
        phase: &str,
    ) -> Result<Instant, RoverError> {
        loop {
            if self.pins.echo_is_high()? == level {
                return Ok(Instant::now());
            }
            if Instant::now() >= deadline {
                return Err(RoverError::SensorTimeout {
                    sensor: self.pins.id().to_string(),
                    phase: phase.to_string(),
                });
            }
            std::hint::spin_loop();
        }
    }
}

impl RangeSensor for RangeMonitor {
    fn measure(&mut self) -> DistanceSample {
        match self.try_measure() {
            Ok(cm) => DistanceSample::new(cm),
            Err(e) => {
                debug!(sensor = self.pins.id(), error = %e, "range sample dropped");
                DistanceSample::unknown()
            }
        }
    }
}
