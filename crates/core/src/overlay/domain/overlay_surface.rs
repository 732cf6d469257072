use crate::shared::bounding_box::{BoundingBox, Dimensions};

/// Domain interface for the drawing layer stacked above the video.
///
/// Coordinates are in display space (see [`size`](OverlaySurface::size)).
pub trait OverlaySurface: Send {
    fn size(&self) -> Dimensions;

    /// Removes everything drawn so far.
    fn clear(&mut self);

    /// Draws a rectangle with a text label anchored to it. `known` is false
    /// for faces that matched no identity.
    fn draw_box(
        &mut self,
        bbox: &BoundingBox,
        label: &str,
        known: bool,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Makes the current drawing visible. Called once at the end of every pass.
    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
