use std::sync::{Arc, Mutex, MutexGuard};

use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::shared::bounding_box::{BoundingBox, Dimensions};

#[derive(Clone, Debug, PartialEq)]
pub struct LabeledBox {
    pub bbox: BoundingBox,
    pub label: String,
    pub known: bool,
}

/// A presented set of boxes. `generation` increments on every present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub size: Dimensions,
    pub boxes: Vec<LabeledBox>,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Buffers {
    back: Vec<LabeledBox>,
    front: Scene,
}

/// Shared list of draw commands, read by a UI canvas.
///
/// Drawing goes to a back buffer; readers only ever see the last presented
/// scene, so a half-drawn pass is never rendered. Clones share state.
#[derive(Clone, Debug)]
pub struct OverlayScene {
    size: Dimensions,
    buffers: Arc<Mutex<Buffers>>,
}

impl OverlayScene {
    pub fn new(size: Dimensions) -> Self {
        Self {
            size,
            buffers: Arc::new(Mutex::new(Buffers {
                back: Vec::new(),
                front: Scene {
                    size,
                    ..Scene::default()
                },
            })),
        }
    }

    /// The last presented scene.
    pub fn snapshot(&self) -> Scene {
        self.lock().front.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        // draw commands stay consistent even if a writer panicked mid-pass
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OverlaySurface for OverlayScene {
    fn size(&self) -> Dimensions {
        self.size
    }

    fn clear(&mut self) {
        self.lock().back.clear();
    }

    fn draw_box(
        &mut self,
        bbox: &BoundingBox,
        label: &str,
        known: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.lock().back.push(LabeledBox {
            bbox: *bbox,
            label: label.to_string(),
            known,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut buffers = self.lock();
        let boxes = buffers.back.clone();
        let generation = buffers.front.generation + 1;
        buffers.front = Scene {
            size: self.size,
            boxes,
            generation,
        };
        Ok(())
    }
}
