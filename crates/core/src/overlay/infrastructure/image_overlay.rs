use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::shared::bounding_box::{BoundingBox, Dimensions};
use crate::shared::frame::Frame;

use super::overlay_scene::{OverlayScene, Scene};

const KNOWN_COLOR: Rgb<u8> = Rgb([0, 200, 83]);
const UNKNOWN_COLOR: Rgb<u8> = Rgb([229, 57, 53]);
const BORDER_PX: i32 = 2;

/// Overlay that can be rasterized onto a frame for headless snapshots.
///
/// Records boxes like [`OverlayScene`]; [`render`](ImageOverlay::render)
/// draws the last presented scene with `imageproc`. Labels are not
/// rasterized, read them from [`labels`](ImageOverlay::labels).
#[derive(Clone, Debug)]
pub struct ImageOverlay {
    scene: OverlayScene,
}

impl ImageOverlay {
    pub fn new(size: Dimensions) -> Self {
        Self {
            scene: OverlayScene::new(size),
        }
    }

    pub fn snapshot(&self) -> Scene {
        self.scene.snapshot()
    }

    pub fn labels(&self) -> Vec<String> {
        self.snapshot().boxes.into_iter().map(|b| b.label).collect()
    }

    /// Draws the presented boxes over `background`, scaled to the overlay size.
    ///
    /// Without a background the boxes go onto a black canvas.
    pub fn render(&self, background: Option<&Frame>) -> RgbImage {
        let scene = self.snapshot();
        let size = scene.size;
        let mut canvas = background
            .and_then(Frame::to_rgb_image)
            .map(|img| {
                if img.dimensions() == (size.width, size.height) {
                    img
                } else {
                    imageops::resize(&img, size.width, size.height, imageops::FilterType::Triangle)
                }
            })
            .unwrap_or_else(|| RgbImage::new(size.width, size.height));

        for labeled in &scene.boxes {
            let color = if labeled.known {
                KNOWN_COLOR
            } else {
                UNKNOWN_COLOR
            };
            draw_border(&mut canvas, &labeled.bbox.clamp_to(size), color);
        }
        canvas
    }
}

impl OverlaySurface for ImageOverlay {
    fn size(&self) -> Dimensions {
        self.scene.size()
    }

    fn clear(&mut self) {
        self.scene.clear();
    }

    fn draw_box(
        &mut self,
        bbox: &BoundingBox,
        label: &str,
        known: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.scene.draw_box(bbox, label, known)
    }

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.scene.present()
    }
}

fn draw_border(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..BORDER_PX {
        let w = bbox.width.round() as i32 - 2 * inset;
        let h = bbox.height.round() as i32 - 2 * inset;
        if w <= 0 || h <= 0 {
            break;
        }
        let rect = Rect::at(bbox.x.round() as i32 + inset, bbox.y.round() as i32 + inset)
            .of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
