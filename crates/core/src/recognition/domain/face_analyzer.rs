use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::{BoundingBox, Dimensions};
use crate::shared::frame::Frame;

/// One detected face: geometry, landmarks, and identity descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceDescription {
    pub bbox: BoundingBox,
    pub score: f64,
    pub landmarks: Option<FaceLandmarks>,
    pub descriptor: Descriptor,
}

impl FaceDescription {
    /// Maps geometry from `source` resolution to `target`; the descriptor is untouched.
    pub fn rescaled(&self, source: Dimensions, target: Dimensions) -> Self {
        let landmarks = if source.is_empty() {
            self.landmarks.clone()
        } else {
            let sx = target.width as f64 / source.width as f64;
            let sy = target.height as f64 / source.height as f64;
            self.landmarks.as_ref().map(|lm| lm.scaled(sx, sy))
        };
        Self {
            bbox: self.bbox.rescale(source, target),
            score: self.score,
            landmarks,
            descriptor: self.descriptor.clone(),
        }
    }
}

/// Domain interface to the face-recognition capability provider.
///
/// Both calls run detection, landmark extraction and descriptor extraction
/// in one go. Implementations may hold inference sessions, hence `&mut self`.
pub trait FaceAnalyzer: Send {
    /// The most confident face in `frame`, or `None` when no face is found.
    fn detect_single(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceDescription>, Box<dyn std::error::Error>>;

    /// Every face in `frame`, in frame coordinates.
    fn detect_all(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<FaceDescription>, Box<dyn std::error::Error>>;
}

/// Rescales a frame's detections to the display size.
pub fn resize_results(
    detections: &[FaceDescription],
    source: Dimensions,
    display: Dimensions,
) -> Vec<FaceDescription> {
    detections
        .iter()
        .map(|d| d.rescaled(source, display))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(x: f64, y: f64, w: f64, h: f64) -> FaceDescription {
        FaceDescription {
            bbox: BoundingBox::new(x, y, w, h),
            score: 0.9,
            landmarks: Some(FaceLandmarks::new([(x + 1.0, y + 1.0); 5])),
            descriptor: Descriptor::new(vec![0.5, 0.5]),
        }
    }

    #[test]
    fn test_resize_results_scales_boxes_and_landmarks() {
        let detections = vec![face(100.0, 100.0, 50.0, 50.0)];
        let resized = resize_results(
            &detections,
            Dimensions::new(1280, 976),
            Dimensions::new(640, 488),
        );
        assert_eq!(resized.len(), 1);
        assert_relative_eq!(resized[0].bbox.x, 50.0);
        assert_relative_eq!(resized[0].bbox.height, 25.0);
        let lm = resized[0].landmarks.as_ref().unwrap();
        assert_relative_eq!(lm.points()[0].0, 50.5);
    }

    #[test]
    fn test_resize_results_keeps_descriptor_and_score() {
        let detections = vec![face(0.0, 0.0, 10.0, 10.0)];
        let resized = resize_results(
            &detections,
            Dimensions::new(320, 244),
            Dimensions::new(640, 488),
        );
        assert_eq!(resized[0].descriptor, detections[0].descriptor);
        assert_relative_eq!(resized[0].score, 0.9);
    }

    #[test]
    fn test_resize_results_empty() {
        let resized = resize_results(&[], Dimensions::new(320, 244), Dimensions::new(640, 488));
        assert!(resized.is_empty());
    }
}
