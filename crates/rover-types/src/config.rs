//! Tunable configuration for every subsystem.
//!
//! Thresholds, step scaling, and speeds are plain parameters rather than
//! constants; the defaults below are a working starting point, not an
//! authority. Call [`RoverConfig::validate`] before constructing any hardware.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FrameSize, RoverError};

/// How the chassis turns in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// Both wheel sets active, spinning in opposite directions.
    #[default]
    SkidSteer,
    /// Inner wheel stopped, outer wheel forward.
    Pivot,
}

/// What the arbitration loop does with the chassis while no target is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekBehavior {
    /// Issue no drive command; the previous motion persists.
    #[default]
    Hold,
    /// Stop the chassis.
    Stop,
}

/// Top-level operating mode of the `rover` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Autonomous,
    Jog,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Autonomous => write!(f, "autonomous"),
            Mode::Jog => write!(f, "jog"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Differential drive wiring and speeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub left_forward_channel: u8,
    pub left_reverse_channel: u8,
    pub right_forward_channel: u8,
    pub right_reverse_channel: u8,
    pub turn_mode: TurnMode,
    /// Forward speed (%) once the target is centred.
    pub cruise_speed: u8,
    /// Speed (%) used when the chassis turns toward the target.
    pub turn_speed: u8,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            left_forward_channel: 0,
            left_reverse_channel: 1,
            right_forward_channel: 2,
            right_reverse_channel: 3,
            turn_mode: TurnMode::default(),
            cruise_speed: 50,
            turn_speed: 30,
        }
    }
}

/// A single servo axis: output channel, angle limits, and the pulse widths
/// that correspond to those limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub channel: u8,
    pub min_degrees: i32,
    pub max_degrees: i32,
    /// Pulse width (µs) at `min_degrees`.
    pub min_pulse_us: f64,
    /// Pulse width (µs) at `max_degrees`.
    pub max_pulse_us: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            channel: 4,
            min_degrees: 0,
            max_degrees: 180,
            min_pulse_us: 500.0,
            max_pulse_us: 2500.0,
        }
    }
}

/// Pan-tilt mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub pan: AxisConfig,
    pub tilt: AxisConfig,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            pan: AxisConfig {
                channel: 4,
                ..AxisConfig::default()
            },
            tilt: AxisConfig {
                channel: 5,
                ..AxisConfig::default()
            },
        }
    }
}

/// Ultrasonic ranging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Distances strictly below this are obstructed.
    pub stop_threshold_cm: f32,
    /// Extra clearance required to leave the obstructed state.
    pub clearance_hysteresis_cm: f32,
    /// Deadline for each of the echo-rise and echo-fall waits.
    pub echo_timeout_ms: u64,
    pub trigger_pulse_us: u64,
    /// Pause between samples.
    pub sample_interval_ms: u64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            stop_threshold_cm: 20.0,
            clearance_hysteresis_cm: 0.0,
            echo_timeout_ms: 1000,
            trigger_pulse_us: 10,
            sample_interval_ms: 100,
        }
    }
}

impl RangeConfig {
    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Vision target selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub target_class: String,
    /// Detections must score strictly above this.
    pub confidence_threshold: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Pause between processed frames.
    pub frame_interval_ms: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            target_class: "person".to_string(),
            confidence_threshold: 0.6,
            frame_width: 640,
            frame_height: 360,
            frame_interval_ms: 50,
        }
    }
}

impl VisionConfig {
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Decision thresholds and cadence of the arbitration loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrationConfig {
    /// Horizontal offsets strictly greater than this trigger a pan correction.
    pub pan_threshold_px: i32,
    /// Vertical offsets strictly greater than this trigger a tilt correction.
    pub tilt_threshold_px: i32,
    /// Offset pixels per degree of correction.
    pub step_divisor: i32,
    /// Upper bound on a single correction step.
    pub max_step_degrees: i32,
    /// Pan bearing beyond which the chassis turns toward the target.
    pub steer_threshold_degrees: i32,
    pub seek_behavior: SeekBehavior,
    pub cycle_ms: u64,
    /// A producer silent for longer than this is reported as stale.
    pub stale_after_ms: u64,
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            pan_threshold_px: 10,
            tilt_threshold_px: 20,
            step_divisor: 10,
            max_step_degrees: 10,
            steer_threshold_degrees: 10,
            seek_behavior: SeekBehavior::default(),
            cycle_ms: 50,
            stale_after_ms: 3000,
        }
    }
}

impl ArbitrationConfig {
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RoverConfig
// ────────────────────────────────────────────────────────────────────────────

/// Complete configuration of the vehicle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoverConfig {
    pub mode: Mode,
    pub drive: DriveConfig,
    pub aim: AimConfig,
    pub range: RangeConfig,
    pub vision: VisionConfig,
    pub arbitration: ArbitrationConfig,
}

impl RoverConfig {
    /// Reject configurations that cannot be driven safely.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::InvalidConfiguration`] naming the first problem
    /// found.
    pub fn validate(&self) -> Result<(), RoverError> {
        let invalid = |msg: String| Err(RoverError::InvalidConfiguration(msg));

        let mut owners: HashMap<u8, &str> = HashMap::new();
        let channels = [
            (self.drive.left_forward_channel, "drive.left_forward_channel"),
            (self.drive.left_reverse_channel, "drive.left_reverse_channel"),
            (self.drive.right_forward_channel, "drive.right_forward_channel"),
            (self.drive.right_reverse_channel, "drive.right_reverse_channel"),
            (self.aim.pan.channel, "aim.pan.channel"),
            (self.aim.tilt.channel, "aim.tilt.channel"),
        ];
        for (channel, name) in channels {
            if let Some(other) = owners.insert(channel, name) {
                return invalid(format!("channel {channel} assigned to both {other} and {name}"));
            }
        }

        for (name, axis) in [("pan", &self.aim.pan), ("tilt", &self.aim.tilt)] {
            if axis.min_degrees > axis.max_degrees {
                return invalid(format!(
                    "aim.{name}: min_degrees {} > max_degrees {}",
                    axis.min_degrees, axis.max_degrees
                ));
            }
            if axis.min_pulse_us.partial_cmp(&axis.max_pulse_us) != Some(Ordering::Less) {
                return invalid(format!(
                    "aim.{name}: min_pulse_us {} must be below max_pulse_us {}",
                    axis.min_pulse_us, axis.max_pulse_us
                ));
            }
        }

        if self.drive.cruise_speed > 100 || self.drive.turn_speed > 100 {
            return invalid("drive speeds must be within 0..=100".to_string());
        }
        if self.arbitration.step_divisor <= 0 {
            return invalid("arbitration.step_divisor must be positive".to_string());
        }
        if self.arbitration.max_step_degrees < 1 {
            return invalid("arbitration.max_step_degrees must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.vision.confidence_threshold) {
            return invalid(format!(
                "vision.confidence_threshold {} outside [0, 1]",
                self.vision.confidence_threshold
            ));
        }
        if self.vision.frame_width == 0 || self.vision.frame_height == 0 {
            return invalid("vision frame dimensions must be non-zero".to_string());
        }
        if self.range.echo_timeout_ms == 0 {
            return invalid("range.echo_timeout_ms must be non-zero".to_string());
        }
        Ok(())
    }
}
