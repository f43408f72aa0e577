//! `ObjectDetector` trait for vision models.
//!
//! Model loading and inference stay behind this seam. Detectors report every
//! box they find; picking the target is the tracker's job.

use rover_types::{Detection, RoverError};

use crate::camera::CameraFrame;

/// An object detector run once per frame.
pub trait ObjectDetector: Send {
    /// Stable identifier, e.g. `"yolo-n"`.
    fn id(&self) -> &str;

    /// Run inference on `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::DetectorFailed`] if inference fails.
    fn detect(&mut self, frame: &CameraFrame) -> Result<Vec<Detection>, RoverError>;
}
