use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::camera::domain::video_surface::VideoSurface;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::pipeline::pass_logger::PassLogger;
use crate::pipeline::recognize_frame_use_case::RecognizeFrameUseCase;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;

/// Counters reported when the poller stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollerStats {
    pub passes: usize,
    pub failed_passes: usize,
    /// Ticks that fired while a pass was still running.
    pub skipped_ticks: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PollerEvent {
    /// The first pass over a real frame completed without error.
    Ready,
    Stopped(PollerStats),
}

/// Runs one recognition pass per tick on a dedicated thread.
///
/// Passes never overlap: ticks that arrive during a pass are drained and
/// counted as skipped. A failing pass is logged and the loop continues.
pub struct FramePoller {
    use_case: RecognizeFrameUseCase,
    analyzer: Box<dyn FaceAnalyzer>,
    overlay: Box<dyn OverlaySurface>,
    video: VideoSurface,
    logger: Box<dyn PassLogger>,
}

impl FramePoller {
    pub fn new(
        use_case: RecognizeFrameUseCase,
        analyzer: Box<dyn FaceAnalyzer>,
        overlay: Box<dyn OverlaySurface>,
        video: VideoSurface,
        logger: Box<dyn PassLogger>,
    ) -> Self {
        Self {
            use_case,
            analyzer,
            overlay,
            video,
            logger,
        }
    }

    /// Starts polling every `interval`. Stops after `max_passes` passes
    /// when given, otherwise when the handle is stopped or dropped.
    pub fn spawn(
        self,
        interval: Duration,
        max_passes: Option<usize>,
        events: Option<Sender<PollerEvent>>,
    ) -> PollerHandle {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread = std::thread::spawn(move || self.run(interval, max_passes, stop_rx, events));
        PollerHandle {
            stop_tx,
            thread: Some(thread),
        }
    }

    fn run(
        mut self,
        interval: Duration,
        max_passes: Option<usize>,
        stop_rx: Receiver<()>,
        events: Option<Sender<PollerEvent>>,
    ) -> PollerStats {
        let ticker = crossbeam_channel::tick(interval);
        let mut stats = PollerStats::default();
        let mut ready = false;

        log::info!("Frame poller started ({} ms interval)", interval.as_millis());
        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    stats.passes += 1;
                    match self.run_pass(stats.passes) {
                        Ok(processed_frame) => {
                            if processed_frame && !ready {
                                ready = true;
                                send(&events, PollerEvent::Ready);
                            }
                        }
                        Err(e) => {
                            stats.failed_passes += 1;
                            log::warn!("Pass {} failed: {e}", stats.passes);
                        }
                    }

                    while ticker.try_recv().is_ok() {
                        stats.skipped_ticks += 1;
                    }
                    if max_passes.is_some_and(|max| stats.passes >= max) {
                        break;
                    }
                }
            }
        }

        log::info!(
            "Frame poller stopped: {} passes, {} failed, {} skipped ticks",
            stats.passes,
            stats.failed_passes,
            stats.skipped_ticks
        );
        self.logger.summary();
        send(&events, PollerEvent::Stopped(stats));
        stats
    }

    /// Returns whether a frame was available for the pass.
    fn run_pass(&mut self, index: usize) -> Result<bool, Box<dyn std::error::Error>> {
        let frame = self.video.current_frame();
        let result = self.use_case.execute(
            frame.as_ref(),
            self.analyzer.as_mut(),
            self.overlay.as_mut(),
            self.logger.as_mut(),
        );
        // present even after a failure so a stale drawing never stays up
        let presented = self.overlay.present();
        let faces = result?;
        presented?;
        self.logger.pass(index, faces.len());
        Ok(frame.is_some())
    }
}

fn send(events: &Option<Sender<PollerEvent>>, event: PollerEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Owning handle to a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<PollerStats>>,
}

impl PollerHandle {
    /// Signals the poller and waits for the current pass to finish.
    pub fn stop(mut self) -> PollerStats {
        let _ = self.stop_tx.try_send(());
        self.join_thread()
    }

    /// Waits for a poller started with `max_passes` to finish on its own.
    pub fn join(mut self) -> PollerStats {
        self.join_thread()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    fn join_thread(&mut self) -> PollerStats {
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                log::error!("Frame poller thread panicked");
                PollerStats::default()
            }
            None => PollerStats::default(),
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            let _ = self.stop_tx.try_send(());
            self.join_thread();
        }
    }
}
