//! [`TargetTracker`] – reduces raw detections to the one target the vehicle
//! follows.
//!
//! Per frame the tracker keeps detections of the configured class whose
//! confidence is strictly above the threshold, picks the most confident one,
//! and reports its box centre as a [`DetectionResult`].

use rover_hal::camera::CameraFrame;
use rover_hal::detector::ObjectDetector;
use rover_types::config::VisionConfig;
use rover_types::{Detection, DetectionResult, FrameSize, RoverError, TargetOffset};
use tracing::warn;

/// Best detection of `class` scoring strictly above `min_confidence`.
pub fn select_target<'a>(
    detections: &'a [Detection],
    class: &str,
    min_confidence: f32,
) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|d| d.label == class && d.confidence > min_confidence)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

pub struct TargetTracker {
    detector: Box<dyn ObjectDetector>,
    target_class: String,
    confidence_threshold: f32,
    frame_size: FrameSize,
}

impl TargetTracker {
    pub fn new(detector: Box<dyn ObjectDetector>, config: &VisionConfig) -> Self {
        Self {
            detector,
            target_class: config.target_class.clone(),
            confidence_threshold: config.confidence_threshold,
            frame_size: config.frame_size(),
        }
    }

    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    /// Run the detector on `frame` and select the target.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::DetectorFailed`] when inference fails. A frame
    /// without the target is `Ok(DetectionResult::NotFound)`, not an error.
    pub fn try_track(&mut self, frame: &CameraFrame) -> Result<DetectionResult, RoverError> {
        let detections = self.detector.detect(frame)?;
        let result = match select_target(&detections, &self.target_class, self.confidence_threshold) {
            Some(d) => {
                let (center_x, center_y) = d.bbox.center();
                DetectionResult::Found {
                    center_x,
                    center_y,
                    confidence: d.confidence,
                }
            }
            None => DetectionResult::NotFound,
        };
        Ok(result)
    }

    /// Like [`try_track`][Self::try_track], but a detector failure yields
    /// `None` so the caller keeps its previous result.
    pub fn track(&mut self, frame: &CameraFrame) -> Option<DetectionResult> {
        match self.try_track(frame) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(detector = self.detector.id(), error = %e, "detection failed; keeping last result");
                None
            }
        }
    }

    /// Pixel offset of `result` from the frame centre.
    pub fn offset(&self, result: &DetectionResult) -> Option<TargetOffset> {
        result.offset_from(self.frame_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::camera::Camera;
    use rover_hal::sim::{ScriptedDetector, SimCamera};
    use rover_types::BoundingBox;

    fn det(label: &str, confidence: f32, bbox: BoundingBox) -> Detection {
        Detection {
            label: label.to_string(),
            confidence,
            bbox,
        }
    }

    fn frame() -> CameraFrame {
        SimCamera::new("cam", FrameSize::new(640, 360)).capture().unwrap()
    }

    #[test]
    fn selects_most_confident_match_of_class() {
        let detections = vec![
            det("person", 0.7, BoundingBox::new(0, 0, 10, 10)),
            det("dog", 0.99, BoundingBox::new(0, 0, 20, 20)),
            det("person", 0.9, BoundingBox::new(100, 100, 200, 200)),
            det("person", 0.5, BoundingBox::new(5, 5, 6, 6)),
        ];
        let best = select_target(&detections, "person", 0.6).unwrap();
        assert_eq!(best.confidence, 0.9);
    }

    #[test]
    fn threshold_is_strict() {
        let detections = vec![det("person", 0.6, BoundingBox::new(0, 0, 10, 10))];
        assert!(select_target(&detections, "person", 0.6).is_none());
    }

    #[test]
    fn tracks_box_center_and_offset() {
        let detector = ScriptedDetector::always(
            "script",
            vec![det("person", 0.8, BoundingBox::new(350, 130, 450, 230))],
        );
        let mut tracker = TargetTracker::new(Box::new(detector), &VisionConfig::default());
        let result = tracker.track(&frame()).unwrap();
        assert_eq!(
            result,
            DetectionResult::Found {
                center_x: 400,
                center_y: 180,
                confidence: 0.8,
            }
        );
        assert_eq!(tracker.offset(&result), Some(TargetOffset { dx: 80, dy: 0 }));
    }

    #[test]
    fn absent_class_is_not_found() {
        let detector = ScriptedDetector::always(
            "script",
            vec![det("cell phone", 0.95, BoundingBox::new(0, 0, 10, 10))],
        );
        let mut tracker = TargetTracker::new(Box::new(detector), &VisionConfig::default());
        assert_eq!(tracker.track(&frame()), Some(DetectionResult::NotFound));
    }

    #[test]
    fn detector_failure_yields_no_fresh_result() {
        let detector = ScriptedDetector::new("script", vec![Err("model crashed".to_string())]);
        let mut tracker = TargetTracker::new(Box::new(detector), &VisionConfig::default());
        assert!(tracker.track(&frame()).is_none());
        assert!(matches!(
            tracker.try_track(&frame()),
            Err(RoverError::DetectorFailed(_))
        ));
    }
}
