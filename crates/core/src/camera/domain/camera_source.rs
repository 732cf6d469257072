use crate::shared::bounding_box::Dimensions;
use crate::shared::frame::Frame;

/// Domain interface for a live video source.
pub trait CameraSource: Send {
    /// Starts the stream and returns its native resolution.
    fn open(&mut self) -> Result<Dimensions, Box<dyn std::error::Error>>;

    /// Blocks until the next frame is decoded. `Ok(None)` means the stream ended.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    fn close(&mut self);
}
