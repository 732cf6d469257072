use crate::recognition::domain::face_analyzer::{FaceAnalyzer, FaceDescription};
use crate::shared::frame::Frame;

use super::arcface_embedder::ArcFaceEmbedder;
use super::onnx_face_detector::{DetectedFace, OnnxFaceDetector};

/// Detector plus embedder: every detected face gets a descriptor.
pub struct OnnxFaceAnalyzer {
    detector: OnnxFaceDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceAnalyzer {
    pub fn new(detector: OnnxFaceDetector, embedder: ArcFaceEmbedder) -> Self {
        Self { detector, embedder }
    }

    fn describe(
        &mut self,
        frame: &Frame,
        face: DetectedFace,
    ) -> Result<Option<FaceDescription>, Box<dyn std::error::Error>> {
        let bbox = face.bbox.clamp_to(frame.dimensions());
        if bbox.area() <= 0.0 {
            log::debug!("Dropping face outside frame {}: {:?}", frame.index(), face.bbox);
            return Ok(None);
        }
        let descriptor = self
            .embedder
            .describe(frame, &bbox, face.landmarks.as_ref())?;
        Ok(Some(FaceDescription {
            bbox,
            score: face.score,
            landmarks: face.landmarks,
            descriptor,
        }))
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn detect_single(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceDescription>, Box<dyn std::error::Error>> {
        // detections arrive sorted by score
        for face in self.detector.detect(frame)? {
            if let Some(description) = self.describe(frame, face)? {
                return Ok(Some(description));
            }
        }
        Ok(None)
    }

    fn detect_all(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<FaceDescription>, Box<dyn std::error::Error>> {
        let faces = self.detector.detect(frame)?;
        let mut described = Vec::with_capacity(faces.len());
        for face in faces {
            if let Some(description) = self.describe(frame, face)? {
                described.push(description);
            }
        }
        Ok(described)
    }
}
