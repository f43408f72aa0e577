//! In-process simulated drivers for CI/CD testing without physical hardware.
//!
//! Every HAL seam has a stub here that records commands or plays back a
//! script, so the full control stack runs headless in tests and on a
//! development machine.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::drive::DriveController;
//! use rover_hal::pulse::PulseBus;
//! use rover_hal::sim::SimPulseOutput;
//! use rover_types::config::DriveConfig;
//!
//! let sim = SimPulseOutput::new("sim_pwm");
//! let probe = sim.probe();
//! let bus = PulseBus::new(Box::new(sim));
//!
//! let mut drive = DriveController::from_config(&DriveConfig::default(), &bus);
//! drive.move_forward(50).expect("sim drive must succeed");
//! assert_eq!(probe.duty(0), Some(50.0));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rover_types::{Detection, FrameSize, HALF_SPEED_OF_SOUND_CM_PER_S, RoverError};

use crate::camera::{Camera, CameraFrame};
use crate::detector::ObjectDetector;
use crate::echo::EchoPins;
use crate::pulse::{PulseOutput, PulseValue};

// ────────────────────────────────────────────────────────────────────────────
// Stub pulse output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PulseRecord {
    channels: BTreeMap<u8, PulseValue>,
    writes: usize,
    stop_all_calls: usize,
}

/// Read-only view of a [`SimPulseOutput`] that stays valid after the driver
/// has been moved into a [`PulseBus`][crate::pulse::PulseBus].
#[derive(Debug, Clone)]
pub struct PulseProbe {
    record: Arc<Mutex<PulseRecord>>,
}

impl PulseProbe {
    /// Last value written to `channel`.
    pub fn value(&self, channel: u8) -> Option<PulseValue> {
        self.record.lock().channels.get(&channel).copied()
    }

    /// Last duty written to `channel`, if it was a duty write.
    pub fn duty(&self, channel: u8) -> Option<f32> {
        match self.value(channel)? {
            PulseValue::DutyPercent(d) => Some(d),
            PulseValue::WidthMicros(_) => None,
        }
    }

    /// Last pulse width written to `channel`, if it was a width write.
    pub fn width(&self, channel: u8) -> Option<f64> {
        match self.value(channel)? {
            PulseValue::WidthMicros(w) => Some(w),
            PulseValue::DutyPercent(_) => None,
        }
    }

    /// Every channel's last value.
    pub fn snapshot(&self) -> BTreeMap<u8, PulseValue> {
        self.record.lock().channels.clone()
    }

    pub fn writes(&self) -> usize {
        self.record.lock().writes
    }

    pub fn stop_all_calls(&self) -> usize {
        self.record.lock().stop_all_calls
    }
}

/// A simulated pulse generator that records the last value per channel.
/// Succeeds unless a failure was scheduled with [`SimPulseOutput::fail_after`].
pub struct SimPulseOutput {
    id: String,
    record: Arc<Mutex<PulseRecord>>,
    fail_after: Option<usize>,
}

impl SimPulseOutput {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            record: Arc::new(Mutex::new(PulseRecord::default())),
            fail_after: None,
        }
    }

    /// Accept `writes` writes, then reject every later one as if the device
    /// had dropped off the bus.
    pub fn fail_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }

    pub fn probe(&self) -> PulseProbe {
        PulseProbe {
            record: Arc::clone(&self.record),
        }
    }
}

impl PulseOutput for SimPulseOutput {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_pulse(&mut self, channel: u8, value: PulseValue) -> Result<(), RoverError> {
        let mut record = self.record.lock();
        if self.fail_after.is_some_and(|limit| record.writes >= limit) {
            return Err(RoverError::ActuatorUnavailable {
                component: self.id.clone(),
                details: format!("simulated bus fault on channel {channel}"),
            });
        }
        record.writes += 1;
        record.channels.insert(channel, value);
        Ok(())
    }

    fn stop_all(&mut self) -> Result<(), RoverError> {
        let mut record = self.record.lock();
        record.stop_all_calls += 1;
        for value in record.channels.values_mut() {
            *value = match *value {
                PulseValue::DutyPercent(_) => PulseValue::DutyPercent(0.0),
                PulseValue::WidthMicros(_) => PulseValue::WidthMicros(0.0),
            };
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub echo pins
// ────────────────────────────────────────────────────────────────────────────

/// Delay between the trigger falling edge and the echo rising edge.
const ECHO_LEAD: Duration = Duration::from_micros(200);

#[derive(Debug, Clone, Copy)]
enum EchoBehavior {
    Distance(f32),
    Disconnected,
    StuckHigh,
}

/// Handle for changing the simulated obstacle distance while a
/// [`SimEchoPins`] is owned by a running loop.
#[derive(Debug, Clone)]
pub struct EchoControl {
    behavior: Arc<Mutex<EchoBehavior>>,
}

impl EchoControl {
    pub fn set_distance(&self, centimeters: f32) {
        *self.behavior.lock() = EchoBehavior::Distance(centimeters);
    }

    pub fn disconnect(&self) {
        *self.behavior.lock() = EchoBehavior::Disconnected;
    }
}

/// A simulated trigger/echo sensor that synthesises the echo pulse in real
/// time from the configured distance.
pub struct SimEchoPins {
    id: String,
    behavior: Arc<Mutex<EchoBehavior>>,
    trigger_high: bool,
    fired_at: Option<Instant>,
}

impl SimEchoPins {
    fn with_behavior(id: impl Into<String>, behavior: EchoBehavior) -> Self {
        Self {
            id: id.into(),
            behavior: Arc::new(Mutex::new(behavior)),
            trigger_high: false,
            fired_at: None,
        }
    }

    /// Echo an obstacle at `centimeters`.
    pub fn at_distance(id: impl Into<String>, centimeters: f32) -> Self {
        Self::with_behavior(id, EchoBehavior::Distance(centimeters))
    }

    /// Echo line never rises.
    pub fn disconnected(id: impl Into<String>) -> Self {
        Self::with_behavior(id, EchoBehavior::Disconnected)
    }

    /// Echo line rises and never falls.
    pub fn stuck_high(id: impl Into<String>) -> Self {
        Self::with_behavior(id, EchoBehavior::StuckHigh)
    }

    pub fn control(&self) -> EchoControl {
        EchoControl {
            behavior: Arc::clone(&self.behavior),
        }
    }
}

impl EchoPins for SimEchoPins {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_trigger(&mut self, high: bool) -> Result<(), RoverError> {
        if self.trigger_high && !high {
            self.fired_at = Some(Instant::now());
        }
        self.trigger_high = high;
        Ok(())
    }

    fn echo_is_high(&mut self) -> Result<bool, RoverError> {
        let Some(fired_at) = self.fired_at else {
            return Ok(false);
        };
        let elapsed = fired_at.elapsed();
        let high = match *self.behavior.lock() {
            EchoBehavior::Disconnected => false,
            EchoBehavior::StuckHigh => elapsed >= ECHO_LEAD,
            EchoBehavior::Distance(cm) => {
                let width = Duration::from_secs_f64(
                    f64::from(cm.max(0.0)) / HALF_SPEED_OF_SOUND_CM_PER_S,
                );
                elapsed >= ECHO_LEAD && elapsed < ECHO_LEAD + width
            }
        };
        Ok(high)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stub camera
// ────────────────────────────────────────────────────────────────────────────

/// A simulated camera that returns blank greyscale frames of a fixed size.
/// Always succeeds.
pub struct SimCamera {
    id: String,
    size: FrameSize,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, size: FrameSize) -> Self {
        Self {
            id: id.into(),
            size,
        }
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, RoverError> {
        Ok(CameraFrame {
            width: self.size.width,
            height: self.size.height,
            data: vec![0u8; (self.size.width * self.size.height) as usize],
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted detector
// ────────────────────────────────────────────────────────────────────────────

/// One scripted inference outcome.
pub type ScriptStep = Result<Vec<Detection>, String>;

/// A detector that plays back a fixed script, one step per frame, looping
/// at the end.
pub struct ScriptedDetector {
    id: String,
    script: Vec<ScriptStep>,
    cursor: usize,
}

impl ScriptedDetector {
    pub fn new(id: impl Into<String>, script: Vec<ScriptStep>) -> Self {
        Self {
            id: id.into(),
            script,
            cursor: 0,
        }
    }

    /// Report the same detections on every frame.
    pub fn always(id: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self::new(id, vec![Ok(detections)])
    }
}

impl ObjectDetector for ScriptedDetector {
    fn id(&self) -> &str {
        &self.id
    }

    fn detect(&mut self, _frame: &CameraFrame) -> Result<Vec<Detection>, RoverError> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let step = self.script[self.cursor % self.script.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);
        step.map_err(RoverError::DetectorFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::BoundingBox;

    #[test]
    fn sim_pulse_output_records_and_zeroes() {
        let mut sim = SimPulseOutput::new("sim");
        let probe = sim.probe();
        sim.set_pulse(0, PulseValue::DutyPercent(40.0)).unwrap();
        sim.set_pulse(4, PulseValue::WidthMicros(1500.0)).unwrap();
        assert_eq!(probe.writes(), 2);

        sim.stop_all().unwrap();
        assert_eq!(probe.duty(0), Some(0.0));
        assert_eq!(probe.width(4), Some(0.0));
        assert_eq!(probe.stop_all_calls(), 1);
    }

    #[test]
    fn sim_pulse_output_fails_after_limit() {
        let mut sim = SimPulseOutput::new("sim").fail_after(1);
        assert!(sim.set_pulse(0, PulseValue::DutyPercent(1.0)).is_ok());
        assert!(sim.set_pulse(0, PulseValue::DutyPercent(2.0)).is_err());
    }

    #[test]
    fn sim_echo_is_low_before_trigger() {
        let mut pins = SimEchoPins::at_distance("sonar", 30.0);
        assert!(!pins.echo_is_high().unwrap());
    }

    #[test]
    fn disconnected_echo_never_rises() {
        let mut pins = SimEchoPins::disconnected("sonar");
        pins.set_trigger(true).unwrap();
        pins.set_trigger(false).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        assert!(!pins.echo_is_high().unwrap());
    }

    #[test]
    fn scripted_detector_loops_and_reports_failures() {
        let person = Detection {
            label: "person".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(0, 0, 10, 10),
        };
        let mut det = ScriptedDetector::new(
            "script",
            vec![Ok(vec![person.clone()]), Err("npu reset".to_string())],
        );
        let frame = SimCamera::new("cam", FrameSize::new(4, 4)).capture().unwrap();
        assert_eq!(det.detect(&frame).unwrap(), vec![person.clone()]);
        assert!(matches!(det.detect(&frame), Err(RoverError::DetectorFailed(_))));
        assert_eq!(det.detect(&frame).unwrap(), vec![person]);
    }
}
