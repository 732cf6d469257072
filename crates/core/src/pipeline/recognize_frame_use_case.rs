use std::sync::Arc;
use std::time::Instant;

use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::pipeline::pass_logger::PassLogger;
use crate::recognition::domain::face_analyzer::{resize_results, FaceAnalyzer};
use crate::recognition::domain::face_matcher::{FaceMatch, FaceMatcher};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// One labeled face of a pass, in display coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizedFace {
    pub bbox: BoundingBox,
    pub face_match: FaceMatch,
}

/// A single detect-match-draw pass over the current frame.
///
/// The overlay is cleared first, so a pass with no frame or no faces
/// leaves it empty. Presenting the overlay is left to the caller.
pub struct RecognizeFrameUseCase {
    matcher: Arc<FaceMatcher>,
}

impl RecognizeFrameUseCase {
    pub fn new(matcher: Arc<FaceMatcher>) -> Self {
        Self { matcher }
    }

    pub fn execute(
        &self,
        frame: Option<&Frame>,
        analyzer: &mut dyn FaceAnalyzer,
        overlay: &mut dyn OverlaySurface,
        logger: &mut dyn PassLogger,
    ) -> Result<Vec<RecognizedFace>, Box<dyn std::error::Error>> {
        overlay.clear();
        let Some(frame) = frame else {
            return Ok(Vec::new());
        };

        let t0 = Instant::now();
        let detections = analyzer.detect_all(frame)?;
        logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        let resized = resize_results(&detections, frame.dimensions(), overlay.size());

        let t1 = Instant::now();
        let recognized: Vec<RecognizedFace> = resized
            .into_iter()
            .map(|detection| RecognizedFace {
                face_match: self.matcher.find_best_match(&detection.descriptor),
                bbox: detection.bbox,
            })
            .collect();
        logger.timing("match", t1.elapsed().as_secs_f64() * 1000.0);

        let t2 = Instant::now();
        for face in &recognized {
            overlay.draw_box(
                &face.bbox,
                &face.face_match.to_string(),
                face.face_match.is_known(),
            )?;
        }
        logger.timing("draw", t2.elapsed().as_secs_f64() * 1000.0);

        let known = recognized.iter().filter(|f| f.face_match.is_known()).count();
        logger.metric("faces", recognized.len() as f64);
        logger.metric("known_faces", known as f64);

        Ok(recognized)
    }
}
