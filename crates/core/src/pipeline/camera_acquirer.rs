use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::camera::domain::camera_source::CameraSource;
use crate::camera::domain::video_surface::VideoSurface;
use crate::shared::bounding_box::Dimensions;
use crate::shared::retry::with_retry;

/// Consecutive decode errors tolerated before the stream is given up.
const MAX_READ_ERRORS: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub enum CameraEvent {
    Bound(Dimensions),
    Failed(String),
    /// The stream stopped delivering frames; the surface keeps its last frame.
    Ended,
}

/// Opens the camera on its own thread and keeps the video surface fed.
pub struct CameraAcquirer {
    camera: Box<dyn CameraSource>,
    surface: VideoSurface,
    attempts: usize,
    retry_delay: Duration,
}

impl CameraAcquirer {
    pub fn new(
        camera: Box<dyn CameraSource>,
        surface: VideoSurface,
        attempts: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            camera,
            surface,
            attempts,
            retry_delay,
        }
    }

    /// Fire-and-forget: returns immediately, reporting progress on `events`.
    pub fn spawn(self, events: Option<Sender<CameraEvent>>) -> CameraHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let thread = std::thread::spawn(move || self.run(&flag, events));
        CameraHandle {
            cancelled,
            thread: Some(thread),
        }
    }

    fn run(mut self, cancelled: &AtomicBool, events: Option<Sender<CameraEvent>>) {
        let send = |event: CameraEvent| {
            if let Some(tx) = &events {
                let _ = tx.send(event);
            }
        };

        let camera = &mut self.camera;
        let opened = with_retry(self.attempts, self.retry_delay, "Camera open", |_| {
            camera.open()
        });
        let size = match opened {
            Ok(size) => size,
            Err(e) => {
                send(CameraEvent::Failed(e.to_string()));
                return;
            }
        };
        self.surface.bind(size);
        send(CameraEvent::Bound(size));

        let mut read_errors = 0;
        while !cancelled.load(Ordering::Relaxed) {
            match self.camera.next_frame() {
                Ok(Some(frame)) => {
                    read_errors = 0;
                    self.surface.publish(frame);
                }
                Ok(None) => {
                    log::info!("Camera stream ended");
                    send(CameraEvent::Ended);
                    break;
                }
                Err(e) => {
                    read_errors += 1;
                    log::warn!("Camera read failed ({read_errors}/{MAX_READ_ERRORS}): {e}");
                    if read_errors >= MAX_READ_ERRORS {
                        send(CameraEvent::Failed(e.to_string()));
                        break;
                    }
                }
            }
        }
        self.camera.close();
    }
}

/// Owning handle to the capture thread. Dropping it stops capture.
pub struct CameraHandle {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CameraHandle {
    pub fn stop(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Camera thread panicked");
            }
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
