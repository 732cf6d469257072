/// YOLO-pose face detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference and NMS post-processing.
/// Each detection carries 5 landmarks (eyes, nose, mouth corners).
use std::path::Path;

use crate::recognition::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::onnx_session;

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 landmarks × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// A face box in frame coordinates, before descriptor extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    pub score: f64,
    pub landmarks: Option<FaceLandmarks>,
}

pub struct OnnxFaceDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::open_session(model_path)?;
        let input_size =
            onnx_session::declared_input_size(&session).unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    /// Detects faces sorted by descending confidence.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectedFace>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("face detection model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected detection output shape: {shape:?}").into());
        }

        // [1, features, detections] (transposed) or [1, detections, features]
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(face) = parse_row(&row, self.confidence, scale, pad_x, pad_y) {
                raw.push(face);
            }
        }

        Ok(nms(&mut raw, NMS_IOU_THRESH))
    }
}

/// Row layout: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]` in letterbox space.
fn parse_row(
    row: &[f32],
    confidence: f64,
    scale: f64,
    pad_x: u32,
    pad_y: u32,
) -> Option<DetectedFace> {
    if row.len() < 5 {
        return None;
    }
    let score = row[4] as f64;
    if score < confidence {
        return None;
    }

    let unmap_x = |v: f64| (v - pad_x as f64) / scale;
    let unmap_y = |v: f64| (v - pad_y as f64) / scale;

    let (cx, cy, w, h) = (row[0] as f64, row[1] as f64, row[2] as f64, row[3] as f64);
    let bbox = BoundingBox::from_corners(
        unmap_x(cx - w / 2.0),
        unmap_y(cy - h / 2.0),
        unmap_x(cx + w / 2.0),
        unmap_y(cy + h / 2.0),
    );

    let landmarks = (row.len() >= 5 + NUM_KEYPOINT_VALUES).then(|| {
        let mut pts = [(0.0f64, 0.0f64); 5];
        for (k, pt) in pts.iter_mut().enumerate() {
            let base = 5 + k * 3;
            // low-confidence points stay at (0, 0), i.e. invisible
            if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                *pt = (unmap_x(row[base] as f64), unmap_y(row[base + 1] as f64));
            }
        }
        FaceLandmarks::new(pts)
    });

    Some(DetectedFace {
        bbox,
        score,
        landmarks,
    })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let channels = frame.channels() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                let value = src[[src_y, src_x, c.min(channels - 1)]];
                tensor[[0, c, ty, tx]] = value as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [DetectedFace], iou_thresh: f64) -> Vec<DetectedFace> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<DetectedFace> = Vec::new();
    for det in dets.iter() {
        if keep.iter().all(|k| k.bbox.iou(&det.bbox) <= iou_thresh) {
            keep.push(det.clone());
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox::from_corners(x1, y1, x2, y2),
            score,
            landmarks: None,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let frame = Frame::new(vec![128u8; 200 * 100 * 3], 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let frame = Frame::new(vec![255u8; 100 * 50 * 3], 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert!((tensor[[0, 0, y, x]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_row_maps_back_to_frame_coordinates() {
        // scale 2, pad (0, 10): letterbox box centered at (100, 110), 40x40
        let row = [100.0, 110.0, 40.0, 40.0, 0.9];
        let face = parse_row(&row, 0.5, 2.0, 0, 10).unwrap();
        assert_relative_eq!(face.bbox.x, 40.0);
        assert_relative_eq!(face.bbox.y, 40.0);
        assert_relative_eq!(face.bbox.width, 20.0);
        assert_relative_eq!(face.bbox.height, 20.0);
        assert!(face.landmarks.is_none());
    }

    #[test]
    fn test_parse_row_rejects_low_confidence() {
        let row = [100.0, 100.0, 40.0, 40.0, 0.2];
        assert!(parse_row(&row, 0.5, 1.0, 0, 0).is_none());
    }

    #[test]
    fn test_parse_row_hides_low_confidence_keypoints() {
        let mut row = vec![100.0, 100.0, 40.0, 40.0, 0.9];
        for k in 0..5 {
            let conf = if k == 2 { 0.9 } else { 0.1 };
            row.extend_from_slice(&[90.0 + k as f32, 95.0, conf]);
        }
        let face = parse_row(&row, 0.5, 1.0, 0, 0).unwrap();
        let lm = face.landmarks.unwrap();
        assert_eq!(lm.points()[0], (0.0, 0.0));
        assert_eq!(lm.points()[2], (92.0, 95.0));
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.8),
            face(5.0, 5.0, 105.0, 105.0, 0.9),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert_relative_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping_in_score_order() {
        let mut dets = vec![
            face(0.0, 0.0, 50.0, 50.0, 0.6),
            face(200.0, 200.0, 250.0, 250.0, 0.8),
        ];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.8);
    }

    #[test]
    fn test_nms_empty_input() {
        let mut dets: Vec<DetectedFace> = Vec::new();
        assert!(nms(&mut dets, 0.3).is_empty());
    }
}
