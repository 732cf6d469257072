use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::camera::domain::camera_source::CameraSource;
use crate::camera::domain::video_surface::VideoSurface;
use crate::gallery::domain::identity::Roster;
use crate::gallery::domain::image_fetcher::ImageFetcher;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::pipeline::camera_acquirer::{CameraAcquirer, CameraEvent};
use crate::pipeline::frame_poller::{FramePoller, PollerEvent, PollerStats};
use crate::pipeline::load_gallery_use_case::{GalleryReport, LoadGalleryUseCase};
use crate::pipeline::pass_logger::PassLogger;
use crate::pipeline::recognize_frame_use_case::RecognizeFrameUseCase;
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::infrastructure::model_loader::ModelSource;
use crate::shared::bounding_box::Dimensions;
use crate::shared::constants::{
    CAMERA_OPEN_ATTEMPTS, DEFAULT_MATCH_THRESHOLD, DISPLAY_HEIGHT, DISPLAY_WIDTH,
    MODEL_LOAD_ATTEMPTS, POLL_INTERVAL_MS, RETRY_DELAY_MS,
};
use crate::shared::retry::with_retry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionFailure {
    #[error("failed to load models: {0}")]
    ModelLoad(String),
    #[error("camera unavailable: {0}")]
    Camera(String),
    #[error("failed to load roster: {0}")]
    Roster(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionState {
    Loading,
    Ready,
    Failed(SessionFailure),
}

impl SessionState {
    /// Text for the status line.
    pub fn status_text(&self) -> String {
        match self {
            SessionState::Loading => "Initializing".to_string(),
            SessionState::Ready => "Ready".to_string(),
            SessionState::Failed(failure) => format!("Error: {failure}"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionState::Failed(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    State(SessionState),
    Gallery(GalleryReport),
    Stopped(PollerStats),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("match threshold must be finite and non-negative, got {0}")]
    Threshold(f64),
    #[error("poll interval must be greater than zero")]
    PollInterval,
    #[error("display size must be non-zero, got {0}x{1}")]
    DisplaySize(u32, u32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum RosterSource {
    Loaded(Roster),
    /// Read on the session thread; relative image paths resolve against its directory.
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub roster: RosterSource,
    pub model_source: ModelSource,
    pub threshold: f64,
    pub poll_interval: Duration,
    pub display_size: Dimensions,
    pub camera_device: Option<String>,
    pub camera_retries: usize,
    pub model_retries: usize,
    pub retry_delay: Duration,
    /// Stop after this many passes; `None` polls until stopped.
    pub max_passes: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            roster: RosterSource::Loaded(Roster::default()),
            model_source: ModelSource::default(),
            threshold: DEFAULT_MATCH_THRESHOLD,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
            display_size: Dimensions::new(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            camera_device: None,
            camera_retries: CAMERA_OPEN_ATTEMPTS,
            model_retries: MODEL_LOAD_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            max_passes: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::PollInterval);
        }
        if self.display_size.is_empty() {
            return Err(ConfigError::DisplaySize(
                self.display_size.width,
                self.display_size.height,
            ));
        }
        Ok(())
    }
}

pub type AnalyzerLoader =
    Box<dyn FnMut() -> Result<Box<dyn FaceAnalyzer>, Box<dyn std::error::Error>> + Send>;

/// The adapters a session runs on.
pub struct SessionParts {
    /// Called on the session thread, once per model-load attempt.
    pub analyzer_loader: AnalyzerLoader,
    pub camera: Box<dyn CameraSource>,
    pub fetcher: Box<dyn ImageFetcher>,
    pub overlay: Box<dyn OverlaySurface>,
    pub logger: Box<dyn PassLogger>,
}

/// Orchestrates one recognition session:
/// load models → start camera → load gallery → poll frames.
pub struct Session;

impl Session {
    /// Validates `config` and starts the session thread. Progress is
    /// reported through [`SessionHandle::events`].
    pub fn start(config: SessionConfig, parts: SessionParts) -> Result<SessionHandle, ConfigError> {
        config.validate()?;

        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let video = VideoSurface::new();

        let worker = SessionWorker {
            config,
            video: video.clone(),
            events: event_tx,
            stop_rx,
            state: SessionState::Loading,
        };
        let thread = std::thread::spawn(move || worker.run(parts));

        Ok(SessionHandle {
            events: event_rx,
            video,
            stop_tx,
            thread: Some(thread),
        })
    }
}

enum Exit {
    StopRequested,
    PollerFinished,
}

struct SessionWorker {
    config: SessionConfig,
    video: VideoSurface,
    events: Sender<SessionEvent>,
    stop_rx: Receiver<()>,
    state: SessionState,
}

impl SessionWorker {
    fn run(mut self, parts: SessionParts) {
        let SessionParts {
            mut analyzer_loader,
            camera,
            fetcher,
            overlay,
            logger,
        } = parts;
        self.emit(SessionEvent::State(SessionState::Loading));

        let roster = match self.load_roster() {
            Ok(roster) => roster,
            Err(failure) => return self.fail(failure),
        };

        let loaded = with_retry(
            self.config.model_retries,
            self.config.retry_delay,
            "Model load",
            |_| analyzer_loader(),
        );
        let mut analyzer = match loaded {
            Ok(analyzer) => analyzer,
            Err(e) => return self.fail(SessionFailure::ModelLoad(e.to_string())),
        };
        if self.stop_requested() {
            return;
        }

        let (camera_tx, camera_rx) = crossbeam_channel::unbounded();
        let camera_handle = CameraAcquirer::new(
            camera,
            self.video.clone(),
            self.config.camera_retries,
            self.config.retry_delay,
        )
        .spawn(Some(camera_tx));

        let report = LoadGalleryUseCase::new(fetcher.as_ref(), analyzer.as_mut()).execute(&roster);
        let matcher = Arc::new(FaceMatcher::new(report.sets.clone(), self.config.threshold));
        self.emit(SessionEvent::Gallery(report));
        if self.stop_requested() {
            return;
        }

        let (poller_tx, poller_rx) = crossbeam_channel::unbounded();
        let poller = FramePoller::new(
            RecognizeFrameUseCase::new(matcher),
            analyzer,
            overlay,
            self.video.clone(),
            logger,
        )
        .spawn(
            self.config.poll_interval,
            self.config.max_passes,
            Some(poller_tx),
        );

        let stop_rx = self.stop_rx.clone();
        let mut camera_rx = Some(camera_rx);
        let exit = loop {
            let camera_events = camera_rx.clone().unwrap_or_else(crossbeam_channel::never);
            let exit = crossbeam_channel::select! {
                recv(stop_rx) -> _ => Some(Exit::StopRequested),
                recv(poller_rx) -> event => match event {
                    Ok(PollerEvent::Ready) => {
                        self.transition(SessionState::Ready);
                        None
                    }
                    Ok(PollerEvent::Stopped(_)) | Err(_) => Some(Exit::PollerFinished),
                },
                recv(camera_events) -> event => {
                    match event {
                        Ok(event) => self.on_camera_event(event),
                        // capture thread finished; stop watching it
                        Err(_) => camera_rx = None,
                    }
                    None
                },
            };
            if let Some(exit) = exit {
                break exit;
            }
        };

        let stats = match exit {
            Exit::StopRequested => poller.stop(),
            Exit::PollerFinished => poller.join(),
        };
        camera_handle.stop();
        if let Some(rx) = camera_rx {
            for event in rx.try_iter() {
                self.on_camera_event(event);
            }
        }
        self.emit(SessionEvent::Stopped(stats));
    }

    fn on_camera_event(&mut self, event: CameraEvent) {
        match event {
            CameraEvent::Bound(size) => {
                log::info!("Camera bound at {}x{}", size.width, size.height);
            }
            CameraEvent::Failed(message) => {
                self.transition(SessionState::Failed(SessionFailure::Camera(message)));
            }
            CameraEvent::Ended => {}
        }
    }

    fn load_roster(&self) -> Result<Roster, SessionFailure> {
        match &self.config.roster {
            RosterSource::Loaded(roster) => Ok(roster.clone()),
            RosterSource::File(path) => {
                Roster::from_json_file(path).map_err(|e| SessionFailure::Roster(e.to_string()))
            }
        }
    }

    /// Failed is terminal: later transitions are ignored.
    fn transition(&mut self, next: SessionState) {
        if self.state.is_failed() || self.state == next {
            return;
        }
        match &next {
            SessionState::Failed(failure) => log::error!("Session failed: {failure}"),
            other => log::info!("Session state: {}", other.status_text()),
        }
        self.state = next.clone();
        self.emit(SessionEvent::State(next));
    }

    fn fail(&mut self, failure: SessionFailure) {
        self.transition(SessionState::Failed(failure));
    }

    fn stop_requested(&self) -> bool {
        self.stop_rx.try_recv().is_ok()
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Owning handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    events: Receiver<SessionEvent>,
    video: VideoSurface,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// The surface the camera is bound to.
    pub fn video_surface(&self) -> VideoSurface {
        self.video.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stops polling and capture, then waits for the session thread.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Waits for a session with `max_passes` (or a failed one) to end on its own.
    pub fn wait(mut self) {
        self.join();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.try_send(());
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Session thread panicked");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;

    use crate::gallery::domain::identity::Identity;
    use crate::pipeline::pass_logger::NullPassLogger;
    use crate::pipeline::test_stubs::{
        descriptor, face_at, image, sized_frame, RecordingOverlay, StubAnalyzer, StubCamera,
        StubFetcher,
    };
    use crate::shared::bounding_box::BoundingBox;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn config(max_passes: usize) -> SessionConfig {
        SessionConfig {
            roster: RosterSource::Loaded(Roster::new(vec![
                Identity::new("Alice", vec!["alice.jpg".into()]),
                Identity::new("Bob", vec!["bob.jpg".into()]),
            ])),
            poll_interval: Duration::from_millis(10),
            retry_delay: Duration::ZERO,
            max_passes: Some(max_passes),
            ..SessionConfig::default()
        }
    }

    fn fetcher() -> StubFetcher {
        StubFetcher::new()
            .with_image("alice.jpg", image(100))
            .with_image("bob.jpg", image(101))
    }

    /// Gallery: Alice at [0, 0], Bob at [1, 1]. Camera frames show `live`.
    fn analyzer(live: &[f32]) -> StubAnalyzer {
        let bbox = BoundingBox::new(10.0, 10.0, 20.0, 20.0);
        StubAnalyzer::new()
            .with_faces(100, vec![face_at(bbox, descriptor(&[0.0, 0.0]))])
            .with_faces(101, vec![face_at(bbox, descriptor(&[1.0, 1.0]))])
            .with_fallback(vec![face_at(
                BoundingBox::new(32.0, 24.0, 16.0, 12.0),
                descriptor(live),
            )])
    }

    fn once(analyzer: StubAnalyzer) -> AnalyzerLoader {
        let mut slot = Some(analyzer);
        Box::new(move || {
            slot.take()
                .map(|a| Box::new(a) as Box<dyn FaceAnalyzer>)
                .ok_or_else(|| "analyzer already taken".into())
        })
    }

    fn camera() -> StubCamera {
        StubCamera::new(Dimensions::new(64, 48), vec![sized_frame(0, 64, 48)])
    }

    fn parts(loader: AnalyzerLoader, camera: StubCamera, overlay: &RecordingOverlay) -> SessionParts {
        SessionParts {
            analyzer_loader: loader,
            camera: Box::new(camera),
            fetcher: Box::new(fetcher()),
            overlay: Box::new(overlay.clone()),
            logger: Box::new(NullPassLogger),
        }
    }

    /// Collects events until the session stops or its thread exits.
    fn drain(handle: &SessionHandle) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = handle.events().recv_timeout(TIMEOUT) {
            let stopped = matches!(event, SessionEvent::Stopped(_));
            events.push(event);
            if stopped {
                break;
            }
        }
        events
    }

    fn states(events: &[SessionEvent]) -> Vec<SessionState> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::State(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_known_face_is_labeled_and_session_becomes_ready() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let handle = Session::start(
            config(5),
            parts(once(analyzer(&[0.0, 0.0])), camera(), &overlay),
        )
        .unwrap();

        let events = drain(&handle);
        assert_eq!(states(&events), vec![SessionState::Loading, SessionState::Ready]);

        let visible = overlay.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].1, "Alice (0)");
        // 64x48 frame scaled to 640x488
        assert_eq!(visible[0].0.x, 320.0);
        assert!((visible[0].0.height - 122.0).abs() < 1e-9);
        handle.wait();
    }

    #[test]
    fn test_stranger_is_labeled_unknown_with_distance() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let mut cfg = config(3);
        cfg.roster = RosterSource::Loaded(Roster::new(vec![Identity::new(
            "Alice",
            vec!["alice.jpg".into()],
        )]));
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.8, 0.0])), camera(), &overlay)).unwrap();

        drain(&handle);
        assert_eq!(overlay.visible()[0].1, "unknown (0.8)");
    }

    #[test]
    fn test_gallery_report_is_published_before_polling() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let handle = Session::start(
            config(2),
            parts(once(analyzer(&[1.0, 1.0])), camera(), &overlay),
        )
        .unwrap();

        let events = drain(&handle);
        let gallery = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::Gallery(report) => Some(report.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(gallery.sets.len(), 2);
        assert_eq!(gallery.sets[1].label, "Bob");
        assert_eq!(overlay.visible()[0].1, "Bob (0)");
    }

    #[test]
    fn test_empty_gallery_labels_faces_unknown() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let mut cfg = config(2);
        cfg.roster = RosterSource::Loaded(Roster::default());
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.0, 0.0])), camera(), &overlay)).unwrap();

        drain(&handle);
        assert_eq!(overlay.visible()[0].1, "unknown");
    }

    #[test]
    fn test_model_load_failure_is_retried_then_fatal() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let loader: AnalyzerLoader = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("model file is corrupt".into())
        });
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let handle = Session::start(config(2), parts(loader, camera(), &overlay)).unwrap();

        let events = drain(&handle);
        let last = states(&events).pop().unwrap();
        match last {
            SessionState::Failed(SessionFailure::ModelLoad(message)) => {
                assert!(message.contains("corrupt"));
            }
            other => panic!("expected model load failure, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), MODEL_LOAD_ATTEMPTS);
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Stopped(_))));
        assert!(overlay.ops().is_empty());
    }

    #[test]
    fn test_camera_failure_is_reported_but_polling_continues() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let broken = StubCamera::new(Dimensions::new(64, 48), Vec::new()).failing_opens(10);
        let mut cfg = config(3);
        cfg.camera_retries = 2;
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.0, 0.0])), broken, &overlay)).unwrap();

        let events = drain(&handle);
        assert!(states(&events).contains(&SessionState::Failed(SessionFailure::Camera(
            "device busy".into()
        ))));
        match events.last() {
            Some(SessionEvent::Stopped(stats)) => assert_eq!(stats.passes, 3),
            other => panic!("expected stop, got {other:?}"),
        }
        assert!(overlay.visible().is_empty());
    }

    #[test]
    fn test_missing_roster_file_fails_session() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let mut cfg = config(1);
        cfg.roster = RosterSource::File(dir.path().join("people.json"));
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.0])), camera(), &overlay)).unwrap();

        let last = states(&drain(&handle)).pop().unwrap();
        assert!(matches!(last, SessionState::Failed(SessionFailure::Roster(_))));
    }

    #[test]
    fn test_roster_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"[{ "name": "Alice", "img": ["alice.jpg"] }]"#)
            .unwrap();
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let mut cfg = config(2);
        cfg.roster = RosterSource::File(file.path().to_path_buf());
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.0, 0.0])), camera(), &overlay)).unwrap();

        drain(&handle);
        assert_eq!(overlay.visible()[0].1, "Alice (0)");
    }

    #[test]
    fn test_stop_ends_unbounded_session() {
        let overlay = RecordingOverlay::new(Dimensions::new(640, 488));
        let mut cfg = config(1);
        cfg.max_passes = None;
        let handle =
            Session::start(cfg, parts(once(analyzer(&[0.0, 0.0])), camera(), &overlay)).unwrap();

        let ready = handle
            .events()
            .iter()
            .find(|e| *e == SessionEvent::State(SessionState::Ready));
        assert!(ready.is_some());
        handle.stop();
    }

    #[rstest]
    #[case::nan_threshold(f64::NAN, 100, 640, ConfigError::Threshold(f64::NAN))]
    #[case::negative_threshold(-0.1, 100, 640, ConfigError::Threshold(-0.1))]
    #[case::zero_interval(0.49, 0, 640, ConfigError::PollInterval)]
    #[case::zero_display(0.49, 100, 0, ConfigError::DisplaySize(0, 488))]
    fn test_validate_rejects_bad_config(
        #[case] threshold: f64,
        #[case] interval_ms: u64,
        #[case] width: u32,
        #[case] expected: ConfigError,
    ) {
        let config = SessionConfig {
            threshold,
            poll_interval: Duration::from_millis(interval_ms),
            display_size: Dimensions::new(width, 488),
            ..SessionConfig::default()
        };
        let err = config.validate().unwrap_err();
        // NaN never equals itself, so compare the variant text
        assert_eq!(err.to_string(), expected.to_string());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, 0.49);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.display_size, Dimensions::new(640, 488));
    }

    #[rstest]
    #[case::loading(SessionState::Loading, "Initializing")]
    #[case::ready(SessionState::Ready, "Ready")]
    #[case::failed(
        SessionState::Failed(SessionFailure::Camera("no device".into())),
        "Error: camera unavailable: no device"
    )]
    fn test_status_text(#[case] state: SessionState, #[case] expected: &str) {
        assert_eq!(state.status_text(), expected);
    }
}
