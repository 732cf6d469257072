use std::sync::{Arc, Mutex, MutexGuard};

use crate::shared::bounding_box::Dimensions;
use crate::shared::frame::Frame;

#[derive(Debug, Default)]
struct Slot {
    source: Option<Dimensions>,
    frame: Option<Frame>,
    generation: u64,
}

/// The surface a camera stream is bound to: holds the latest frame only.
///
/// Clones share state, so the capture thread publishes and the poller
/// and UI read through their own handles.
#[derive(Clone, Debug, Default)]
pub struct VideoSurface {
    slot: Arc<Mutex<Slot>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the surface as bound to a stream of the given resolution.
    pub fn bind(&self, source: Dimensions) {
        self.lock().source = Some(source);
    }

    pub fn source(&self) -> Option<Dimensions> {
        self.lock().source
    }

    pub fn is_bound(&self) -> bool {
        self.lock().source.is_some()
    }

    /// Replaces the current frame.
    pub fn publish(&self, frame: Frame) {
        let mut slot = self.lock();
        slot.frame = Some(frame);
        slot.generation += 1;
    }

    pub fn current_frame(&self) -> Option<Frame> {
        self.lock().frame.clone()
    }

    /// Increments with every published frame; 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
