use serde::{Deserialize, Serialize};

/// Width and height of a frame, display, or overlay surface in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned face box in floating-point pixel coordinates.
///
/// Kept unclamped: a face partially outside the frame keeps its full
/// geometry so rescaling stays proportional.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Maps the box from `source` resolution onto `target` resolution.
    ///
    /// Each axis scales independently (`target.w / source.w`,
    /// `target.h / source.h`). An empty source leaves the box untouched.
    pub fn rescale(&self, source: Dimensions, target: Dimensions) -> Self {
        if source.is_empty() {
            return *self;
        }
        let sx = target.width as f64 / source.width as f64;
        let sy = target.height as f64 / source.height as f64;
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }

    /// Intersection with `[0, bounds.width] x [0, bounds.height]`.
    pub fn clamp_to(&self, bounds: Dimensions) -> Self {
        let x1 = self.x.clamp(0.0, bounds.width as f64);
        let y1 = self.y.clamp(0.0, bounds.height as f64);
        let x2 = self.right().clamp(0.0, bounds.width as f64);
        let y2 = self.bottom().clamp(0.0, bounds.height as f64);
        Self::from_corners(x1, y1, x2, y2)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}
