//! Stub ports shared by the pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::camera::domain::camera_source::CameraSource;
use crate::gallery::domain::image_fetcher::ImageFetcher;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::recognition::domain::descriptor::Descriptor;
use crate::recognition::domain::face_analyzer::{FaceAnalyzer, FaceDescription};
use crate::shared::bounding_box::{BoundingBox, Dimensions};
use crate::shared::frame::Frame;

// --- Helpers ---

pub fn image(index: usize) -> Frame {
    Frame::new(vec![128; 4 * 4 * 3], 4, 4, 3, index)
}

pub fn sized_frame(index: usize, w: u32, h: u32) -> Frame {
    Frame::new(vec![128; (w * h * 3) as usize], w, h, 3, index)
}

pub fn descriptor(values: &[f32]) -> Descriptor {
    Descriptor::new(values.to_vec())
}

pub fn face_at(bbox: BoundingBox, descriptor: Descriptor) -> FaceDescription {
    FaceDescription {
        bbox,
        score: 0.9,
        landmarks: None,
        descriptor,
    }
}

pub fn face_with(descriptor: Descriptor) -> FaceDescription {
    face_at(BoundingBox::new(10.0, 10.0, 20.0, 20.0), descriptor)
}

// --- Analyzer ---

/// Returns canned faces keyed by frame index.
pub struct StubAnalyzer {
    faces: HashMap<usize, Vec<FaceDescription>>,
    errors: HashMap<usize, String>,
    fallback: Vec<FaceDescription>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StubAnalyzer {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            errors: HashMap::new(),
            fallback: Vec::new(),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_faces(mut self, index: usize, faces: Vec<FaceDescription>) -> Self {
        self.faces.insert(index, faces);
        self
    }

    pub fn with_error(mut self, index: usize, message: &str) -> Self {
        self.errors.insert(index, message.to_string());
        self
    }

    /// Faces for every frame index without an explicit entry.
    pub fn with_fallback(mut self, faces: Vec<FaceDescription>) -> Self {
        self.fallback = faces;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl FaceAnalyzer for StubAnalyzer {
    fn detect_single(
        &mut self,
        frame: &Frame,
    ) -> Result<Option<FaceDescription>, Box<dyn std::error::Error>> {
        Ok(self.detect_all(frame)?.into_iter().next())
    }

    fn detect_all(
        &mut self,
        frame: &Frame,
    ) -> Result<Vec<FaceDescription>, Box<dyn std::error::Error>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(message) = self.errors.get(&frame.index()) {
            return Err(message.clone().into());
        }
        Ok(self
            .faces
            .get(&frame.index())
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

// --- Fetcher ---

pub struct StubFetcher {
    images: HashMap<String, Result<Frame, String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
        }
    }

    pub fn with_image(mut self, locator: &str, frame: Frame) -> Self {
        self.images.insert(locator.to_string(), Ok(frame));
        self
    }

    pub fn with_error(mut self, locator: &str, message: &str) -> Self {
        self.images
            .insert(locator.to_string(), Err(message.to_string()));
        self
    }
}

impl ImageFetcher for StubFetcher {
    fn fetch(&self, locator: &str) -> Result<Frame, Box<dyn std::error::Error>> {
        match self.images.get(locator) {
            Some(Ok(frame)) => Ok(frame.clone()),
            Some(Err(message)) => Err(message.clone().into()),
            None => Err(format!("no such image: {locator}").into()),
        }
    }
}

// --- Overlay ---

#[derive(Clone, Debug, PartialEq)]
pub enum OverlayOp {
    Clear,
    Draw(BoundingBox, String),
    Present,
}

/// Records every overlay call. Clones share the recording.
#[derive(Clone)]
pub struct RecordingOverlay {
    size: Dimensions,
    ops: Arc<Mutex<Vec<OverlayOp>>>,
}

impl RecordingOverlay {
    pub fn new(size: Dimensions) -> Self {
        Self {
            size,
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ops(&self) -> Vec<OverlayOp> {
        self.ops.lock().unwrap().clone()
    }

    /// Boxes drawn since the last clear.
    pub fn visible(&self) -> Vec<(BoundingBox, String)> {
        let ops = self.ops();
        let start = ops
            .iter()
            .rposition(|op| *op == OverlayOp::Clear)
            .map_or(0, |i| i + 1);
        ops[start..]
            .iter()
            .filter_map(|op| match op {
                OverlayOp::Draw(bbox, label) => Some((*bbox, label.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &OverlayOp) -> usize {
        self.ops().iter().filter(|op| *op == wanted).count()
    }
}

impl OverlaySurface for RecordingOverlay {
    fn size(&self) -> Dimensions {
        self.size
    }

    fn clear(&mut self) {
        self.ops.lock().unwrap().push(OverlayOp::Clear);
    }

    fn draw_box(
        &mut self,
        bbox: &BoundingBox,
        label: &str,
        _known: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.ops
            .lock()
            .unwrap()
            .push(OverlayOp::Draw(*bbox, label.to_string()));
        Ok(())
    }

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.ops.lock().unwrap().push(OverlayOp::Present);
        Ok(())
    }
}

// --- Camera ---

/// Serves queued frames, then repeats the last one (or ends, if `ending`).
pub struct StubCamera {
    size: Dimensions,
    frames: VecDeque<Frame>,
    last: Option<Frame>,
    open_failures: usize,
    ending: bool,
    frame_delay: Duration,
    opens: Arc<AtomicUsize>,
}

impl StubCamera {
    pub fn new(size: Dimensions, frames: Vec<Frame>) -> Self {
        Self {
            size,
            frames: frames.into(),
            last: None,
            open_failures: 0,
            ending: false,
            frame_delay: Duration::from_millis(5),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_opens(mut self, count: usize) -> Self {
        self.open_failures = count;
        self
    }

    pub fn ending(mut self) -> Self {
        self.ending = true;
        self
    }

    pub fn opens(&self) -> Arc<AtomicUsize> {
        self.opens.clone()
    }
}

impl CameraSource for StubCamera {
    fn open(&mut self) -> Result<Dimensions, Box<dyn std::error::Error>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_failures > 0 {
            self.open_failures -= 1;
            return Err("device busy".into());
        }
        Ok(self.size)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        std::thread::sleep(self.frame_delay);
        if let Some(frame) = self.frames.pop_front() {
            self.last = Some(frame.clone());
            return Ok(Some(frame));
        }
        if self.ending {
            return Ok(None);
        }
        Ok(self.last.clone())
    }

    fn close(&mut self) {}
}
