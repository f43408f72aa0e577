//! `PulseOutput` trait for PWM / servo pulse generators, and the shared
//! [`PulseBus`] handle every actuator writes through.
//!
//! A single pulse-output device (a PWM controller board, a set of hardware
//! PWM pins, …) drives both the motor duty cycles and the servo pulse widths.
//! Components never own the driver directly: they hold a cloned [`PulseBus`],
//! which serialises access and guarantees the driver is neutralised exactly
//! once on teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rover_types::RoverError;
use tracing::{info, warn};

/// Value written to one output channel. Units are chosen by the caller; the
/// driver converts to its native resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseValue {
    /// Fraction of each period driven high, in percent (`0.0..=100.0`).
    DutyPercent(f32),
    /// Absolute high time of each period, in microseconds.
    WidthMicros(f64),
}

/// A multi-channel pulse generator.
pub trait PulseOutput: Send {
    /// Stable identifier for this device, e.g. `"pca9685@0x40"`.
    fn id(&self) -> &str;

    /// Emit `value` on `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the device does not
    /// accept the write.
    fn set_pulse(&mut self, channel: u8, value: PulseValue) -> Result<(), RoverError>;

    /// Zero every channel this system owns.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the device does not
    /// respond.
    fn stop_all(&mut self) -> Result<(), RoverError>;
}

// ────────────────────────────────────────────────────────────────────────────
// PulseBus
// ────────────────────────────────────────────────────────────────────────────

struct BusInner {
    driver: Mutex<Box<dyn PulseOutput>>,
    released: AtomicBool,
}

/// Cloneable, thread-safe handle to the one [`PulseOutput`] driver.
///
/// After [`PulseBus::release`] every further write is refused, so a loop
/// that is still winding down cannot re-energise a neutralised output.
#[derive(Clone)]
pub struct PulseBus {
    inner: Arc<BusInner>,
}

impl PulseBus {
    pub fn new(driver: Box<dyn PulseOutput>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                driver: Mutex::new(driver),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Forward a write to the driver.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::ActuatorUnavailable`] if the bus was released or
    /// the driver rejects the write.
    pub fn set_pulse(&self, channel: u8, value: PulseValue) -> Result<(), RoverError> {
        let mut driver = self.inner.driver.lock();
        if self.inner.released.load(Ordering::Acquire) {
            return Err(RoverError::ActuatorUnavailable {
                component: driver.id().to_string(),
                details: format!("write to channel {channel} after release"),
            });
        }
        driver.set_pulse(channel, value)
    }

    /// Zero every channel and refuse further writes.
    ///
    /// Only the first call reaches the driver; later calls return
    /// `Ok(false)` without touching hardware.
    ///
    /// # Errors
    ///
    /// Propagates the driver's [`PulseOutput::stop_all`] failure. The bus
    /// stays released even then.
    pub fn release(&self) -> Result<bool, RoverError> {
        let mut driver = self.inner.driver.lock();
        if self.inner.released.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        match driver.stop_all() {
            Ok(()) => {
                info!(driver = driver.id(), "pulse outputs released");
                Ok(true)
            }
            Err(e) => {
                warn!(driver = driver.id(), error = %e, "failed to zero pulse outputs");
                Err(e)
            }
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for PulseBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulseBus")
            .field("released", &self.is_released())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal in-process driver used only for tests.
    struct MockOutput {
        channels: Arc<Mutex<HashMap<u8, PulseValue>>>,
        stop_calls: Arc<Mutex<u32>>,
    }

    impl PulseOutput for MockOutput {
        fn id(&self) -> &str {
            "mock"
        }

        fn set_pulse(&mut self, channel: u8, value: PulseValue) -> Result<(), RoverError> {
            self.channels.lock().insert(channel, value);
            Ok(())
        }

        fn stop_all(&mut self) -> Result<(), RoverError> {
            *self.stop_calls.lock() += 1;
            self.channels.lock().clear();
            Ok(())
        }
    }

    fn mock_bus() -> (PulseBus, Arc<Mutex<HashMap<u8, PulseValue>>>, Arc<Mutex<u32>>) {
        let channels = Arc::new(Mutex::new(HashMap::new()));
        let stop_calls = Arc::new(Mutex::new(0));
        let bus = PulseBus::new(Box::new(MockOutput {
            channels: Arc::clone(&channels),
            stop_calls: Arc::clone(&stop_calls),
        }));
        (bus, channels, stop_calls)
    }

    #[test]
    fn writes_reach_driver() {
        let (bus, channels, _) = mock_bus();
        bus.set_pulse(3, PulseValue::DutyPercent(40.0)).unwrap();
        assert_eq!(channels.lock().get(&3), Some(&PulseValue::DutyPercent(40.0)));
    }

    #[test]
    fn release_happens_exactly_once() {
        let (bus, _, stop_calls) = mock_bus();
        let clone = bus.clone();
        assert!(bus.release().unwrap());
        assert!(!clone.release().unwrap());
        assert!(!bus.release().unwrap());
        assert_eq!(*stop_calls.lock(), 1);
        assert!(clone.is_released());
    }

    #[test]
    fn writes_after_release_are_refused() {
        let (bus, channels, _) = mock_bus();
        bus.release().unwrap();
        let err = bus.set_pulse(0, PulseValue::WidthMicros(1500.0)).unwrap_err();
        assert!(matches!(err, RoverError::ActuatorUnavailable { .. }));
        assert!(channels.lock().is_empty());
    }
}
