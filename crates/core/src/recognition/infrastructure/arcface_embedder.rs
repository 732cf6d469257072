/// ArcFace descriptor extraction using ONNX Runtime.
///
/// Crops a square around each face, resizes it to 112x112 and returns the
/// L2-normalized embedding.
use std::path::Path;

use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::face_landmarks::FaceLandmarks;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::onnx_session;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct ArcFaceEmbedder {
    session: ort::session::Session,
}

impl ArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::open_session(model_path)?;
        Ok(Self { session })
    }

    /// Descriptor for the face at `bbox`, centered on the landmarks when visible.
    pub fn describe(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
        landmarks: Option<&FaceLandmarks>,
    ) -> Result<Descriptor, Box<dyn std::error::Error>> {
        let crop = square_crop(frame, bbox, landmarks)
            .ok_or_else(|| format!("face box {bbox:?} lies outside the frame"))?;
        let tensor = preprocess(crop.data(), crop.width(), crop.height(), crop.channels());
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;
        Ok(Descriptor::normalized(embedding_slice.to_vec()))
    }
}

/// Square crop of side `max(w, h)` around the landmark centroid, or the
/// box center. Clipped to the frame; `None` when nothing is left.
fn square_crop(
    frame: &Frame,
    bbox: &BoundingBox,
    landmarks: Option<&FaceLandmarks>,
) -> Option<Frame> {
    let (cx, cy) = landmarks
        .and_then(FaceLandmarks::center)
        .unwrap_or_else(|| bbox.center());
    let half = bbox.width.max(bbox.height) / 2.0;

    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let x1 = (cx - half).max(0.0).round() as usize;
    let y1 = (cy - half).max(0.0).round() as usize;
    let x2 = (cx + half).min(fw).round() as usize;
    let y2 = (cy + half).min(fh).round() as usize;
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let crop_w = x2 - x1;
    let crop_h = y2 - y1;
    let channels = frame.channels() as usize;
    let src = frame.as_ndarray();
    let mut data = Vec::with_capacity(crop_w * crop_h * channels);
    for row in y1..y2 {
        for col in x1..x2 {
            for c in 0..channels {
                data.push(src[[row, col, c]]);
            }
        }
    }

    Some(Frame::new(
        data,
        crop_w as u32,
        crop_h as u32,
        channels as u8,
        frame.index(),
    ))
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(data: &[u8], width: u32, height: u32, channels: u8) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;
    let channels = channels as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * channels;
            for c in 0..3 {
                if let Some(&value) = data.get(offset + c.min(channels - 1)) {
                    tensor[[0, c, y, x]] = (value as f32 - NORM_MEAN) / NORM_STD;
                }
            }
        }
    }

    tensor
}
