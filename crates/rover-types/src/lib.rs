//! `rover-types` – shared data model for the rover control stack.
//!
//! Every crate in the workspace speaks in these types: the perception layer
//! produces [`DistanceSample`] and [`DetectionResult`] snapshots, the
//! arbitration loop turns them into [`DriveCommand`]s and aim nudges, and the
//! HAL applies those to hardware.
//!
//! # Modules
//!
//! - [`config`] – [`RoverConfig`][config::RoverConfig]: every tunable
//!   (channels, thresholds, speeds, cadences) with startup validation.
//! - [`operator`] – parser for the `<direction><speed-digit>` jog commands.

pub mod config;
pub mod operator;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Half the speed of sound in centimetres per second (≈343 m/s round trip).
pub const HALF_SPEED_OF_SOUND_CM_PER_S: f64 = 17150.0;

// ────────────────────────────────────────────────────────────────────────────
// Range data
// ────────────────────────────────────────────────────────────────────────────

/// One range measurement.
///
/// `valid == false` means the echo timed out and `centimeters` carries no
/// information.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub centimeters: f32,
    pub valid: bool,
}

impl DistanceSample {
    /// A valid reading of `centimeters`.
    pub fn new(centimeters: f32) -> Self {
        Self {
            centimeters,
            valid: true,
        }
    }

    /// The "no echo" sentinel.
    pub fn unknown() -> Self {
        Self {
            centimeters: 0.0,
            valid: false,
        }
    }

    /// The distance when the sample is valid.
    pub fn reading(&self) -> Option<f32> {
        self.valid.then_some(self.centimeters)
    }
}

impl Default for DistanceSample {
    fn default() -> Self {
        Self::unknown()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vision data
// ────────────────────────────────────────────────────────────────────────────

/// Pixel dimensions of a video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Integer pixel centre of the frame.
    pub fn center(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

/// Axis-aligned box in frame pixel coordinates (`[x_min, y_min, x_max, y_max]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Integer centre, floored.
    pub fn center(&self) -> (i32, i32) {
        (
            floor_midpoint(self.x_min, self.x_max),
            floor_midpoint(self.y_min, self.y_max),
        )
    }
}

/// `floor((a + b) / 2)` without overflowing `i32`.
pub fn floor_midpoint(a: i32, b: i32) -> i32 {
    // The midpoint of two i32 values always fits back into i32.
    (i64::from(a) + i64::from(b)).div_euclid(2) as i32
}

/// A single raw detection as reported by an object detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Class label, e.g. `"person"`.
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Outcome of processing one frame for the configured target class.
///
/// Coordinates only exist on the `Found` variant, so a miss can never be
/// consulted for a position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DetectionResult {
    #[default]
    NotFound,
    Found {
        center_x: i32,
        center_y: i32,
        confidence: f32,
    },
}

impl DetectionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DetectionResult::Found { .. })
    }

    /// Offset of the target centre from the centre of `frame`, if found.
    pub fn offset_from(&self, frame: FrameSize) -> Option<TargetOffset> {
        match *self {
            DetectionResult::NotFound => None,
            DetectionResult::Found {
                center_x, center_y, ..
            } => {
                let (cx, cy) = frame.center();
                Some(TargetOffset {
                    dx: center_x.saturating_sub(cx),
                    dy: center_y.saturating_sub(cy),
                })
            }
        }
    }
}

/// Pixel offset of a target from the frame centre. Positive `dx` means the
/// target is right of centre; positive `dy` means below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetOffset {
    pub dx: i32,
    pub dy: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// Actuation
// ────────────────────────────────────────────────────────────────────────────

/// Rotation sense of a single motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Chassis motion for one arbitration cycle. Speeds are percentages in
/// `[0, 100]`; larger values are clamped by the drive controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveCommand {
    Forward(u8),
    Backward(u8),
    TurnLeft(u8),
    TurnRight(u8),
    Stop,
}

impl fmt::Display for DriveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveCommand::Forward(s) => write!(f, "forward@{s}%"),
            DriveCommand::Backward(s) => write!(f, "backward@{s}%"),
            DriveCommand::TurnLeft(s) => write!(f, "turn_left@{s}%"),
            DriveCommand::TurnRight(s) => write!(f, "turn_right@{s}%"),
            DriveCommand::Stop => write!(f, "stop"),
        }
    }
}

/// Which axis of the pan-tilt mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AimAxisId {
    Pan,
    Tilt,
}

impl fmt::Display for AimAxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AimAxisId::Pan => write!(f, "pan"),
            AimAxisId::Tilt => write!(f, "tilt"),
        }
    }
}

/// Sense of a bounded aim step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nudge {
    Increase,
    Decrease,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error taxonomy spanning sensors, actuators, and configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoverError {
    #[error("Sensor Timeout on {sensor}: no echo {phase}")]
    SensorTimeout { sensor: String, phase: String },

    #[error("Detector Failure: {0}")]
    DetectorFailed(String),

    #[error("Actuator Unavailable on {component}: {details}")]
    ActuatorUnavailable { component: String, details: String },

    #[error("Invalid Configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Config Error: {0}")]
    Config(String),
}

impl RoverError {
    /// `true` for errors after which the vehicle cannot keep running.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RoverError::ActuatorUnavailable { .. } | RoverError::InvalidConfiguration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sample_has_no_reading() {
        assert_eq!(DistanceSample::unknown().reading(), None);
        assert_eq!(DistanceSample::new(42.5).reading(), Some(42.5));
        assert!(!DistanceSample::default().valid);
    }

    #[test]
    fn bounding_box_center_is_floored() {
        let bbox = BoundingBox::new(100, 50, 201, 151);
        assert_eq!(bbox.center(), (150, 100));
        assert_eq!(BoundingBox::new(-3, -3, 0, 0).center(), (-2, -2));
    }

    #[test]
    fn bounding_box_center_at_coordinate_extremes() {
        let bbox = BoundingBox::new(i32::MAX - 1, i32::MIN, i32::MAX, i32::MIN + 1);
        assert_eq!(bbox.center(), (i32::MAX - 1, i32::MIN));
        assert_eq!(floor_midpoint(i32::MIN, i32::MAX), -1);
    }

    #[test]
    fn offset_from_frame_center() {
        let frame = FrameSize::new(640, 360);
        let found = DetectionResult::Found {
            center_x: 400,
            center_y: 180,
            confidence: 0.9,
        };
        assert_eq!(
            found.offset_from(frame),
            Some(TargetOffset { dx: 80, dy: 0 })
        );
        assert_eq!(DetectionResult::NotFound.offset_from(frame), None);
    }

    #[test]
    fn drive_command_display() {
        assert_eq!(DriveCommand::Forward(50).to_string(), "forward@50%");
        assert_eq!(DriveCommand::Stop.to_string(), "stop");
    }

    #[test]
    fn rover_error_display_and_fatality() {
        let err = RoverError::ActuatorUnavailable {
            component: "pulse_bus".to_string(),
            details: "i2c nack".to_string(),
        };
        assert!(err.to_string().contains("pulse_bus"));
        assert!(err.is_fatal());

        let timeout = RoverError::SensorTimeout {
            sensor: "hc-sr04".to_string(),
            phase: "rise".to_string(),
        };
        assert!(!timeout.is_fatal());
        assert!(RoverError::InvalidConfiguration("x".into()).is_fatal());
    }
}
