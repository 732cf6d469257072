use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::camera::domain::camera_source::CameraSource;
use crate::shared::bounding_box::Dimensions;
use crate::shared::constants::CAPTURE_FRAMERATE;
use crate::shared::frame::Frame;

/// Adapts a single image file to the [`CameraSource`] interface.
///
/// Behaves like a camera pointed at a still scene: every call to
/// `next_frame` returns the same pixels with an increasing index, paced
/// to the capture frame rate like a real device.
pub struct StillImageCamera {
    path: PathBuf,
    frame: Option<Frame>,
    frame_index: usize,
    frame_interval: Duration,
    next_due: Option<Instant>,
}

impl StillImageCamera {
    pub fn new(path: PathBuf) -> Self {
        Self::with_frame_rate(path, CAPTURE_FRAMERATE)
    }

    pub fn with_frame_rate(path: PathBuf, fps: u32) -> Self {
        Self {
            path,
            frame: None,
            frame_index: 0,
            frame_interval: Duration::from_secs(1) / fps.max(1),
            next_due: None,
        }
    }

    /// Sleeps until the next frame slot.
    fn wait_for_slot(&mut self) {
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_due = Some(due.max(now) + self.frame_interval);
    }
}

impl CameraSource for StillImageCamera {
    fn open(&mut self) -> Result<Dimensions, Box<dyn std::error::Error>> {
        let image = image::open(&self.path)
            .map_err(|e| format!("failed to open {}: {e}", self.path.display()))?;
        let frame = Frame::from_rgb_image(image.to_rgb8(), 0);
        let dimensions = frame.dimensions();
        self.frame = Some(frame);
        self.frame_index = 0;
        self.next_due = None;
        Ok(dimensions)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let frame = self
            .frame
            .as_ref()
            .ok_or("StillImageCamera: not opened")?
            .clone()
            .with_index(self.frame_index);
        self.wait_for_slot();
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
