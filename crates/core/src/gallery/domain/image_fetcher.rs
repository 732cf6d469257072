use crate::shared::frame::Frame;

/// Domain interface for turning a reference image locator into pixels.
pub trait ImageFetcher: Send {
    /// Fetches and decodes the image at `locator` (URI or file path).
    fn fetch(&self, locator: &str) -> Result<Frame, Box<dyn std::error::Error>>;
}
