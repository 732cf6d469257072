use std::time::Duration;

use iced::widget::{canvas, column, container, image, stack, text};
use iced::{ContentFit, Element, Length, Subscription, Task, Theme};

use facestamp_core::overlay::infrastructure::overlay_scene::Scene;
use facestamp_core::pipeline::session::{SessionEvent, SessionState};
use facestamp_core::shared::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

use crate::settings::{Appearance, Settings};
use crate::theme;
use crate::widgets::overlay_canvas::OverlayCanvas;
use crate::workers::session_worker::{self, LiveSession};

const HEADING: &str = "Welcome to Time Stamp with IA";

/// UI refresh rate; recognition runs at its own poll interval.
const REFRESH_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
}

pub struct App {
    settings: Settings,
    session: Option<LiveSession>,
    status: Status,
    frame: Option<image::Handle>,
    frame_generation: u64,
    scene: Scene,
}

/// What the status line shows.
#[derive(Debug, Clone, PartialEq)]
enum Status {
    Session(SessionState),
    /// The session could not be started at all.
    StartFailed(String),
}

impl Status {
    fn is_error(&self) -> bool {
        match self {
            Status::Session(state) => state.is_failed(),
            Status::StartFailed(_) => true,
        }
    }

    fn text(&self) -> String {
        match self {
            Status::Session(state) => state.status_text(),
            Status::StartFailed(msg) => format!("Error: {msg}"),
        }
    }
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let (session, status) = match session_worker::spawn(&settings) {
            Ok(session) => (Some(session), Status::Session(SessionState::Loading)),
            Err(e) => {
                log::error!("Could not start recognition: {e}");
                (None, Status::StartFailed(e))
            }
        };

        (
            Self {
                settings,
                session,
                status,
                frame: None,
                frame_generation: 0,
                scene: Scene::default(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => self.refresh(),
        }
        Task::none()
    }

    fn refresh(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        for event in session.drain() {
            match event {
                SessionEvent::State(state) => {
                    log::info!("Status: {}", state.status_text());
                    self.status = Status::Session(state);
                }
                SessionEvent::Gallery(report) => {
                    log::info!(
                        "Reference gallery ready: {} descriptors",
                        report.descriptor_count()
                    );
                }
                SessionEvent::Stopped(stats) => {
                    log::info!("Recognition stopped after {} passes", stats.passes);
                }
            }
        }

        let generation = session.video.generation();
        if generation != self.frame_generation {
            if let Some(frame) = session.video.current_frame() {
                self.frame = Some(image::Handle::from_rgba(
                    frame.width(),
                    frame.height(),
                    frame.to_rgba_bytes(),
                ));
            }
            self.frame_generation = generation;
        }

        self.scene = session.scene.snapshot();
    }

    pub fn view(&self) -> Element<'_, Message> {
        let width = DISPLAY_WIDTH as f32;
        let height = DISPLAY_HEIGHT as f32;

        let video: Element<'_, Message> = match &self.frame {
            Some(handle) => image(handle.clone())
                .width(width)
                .height(height)
                .content_fit(ContentFit::Fill)
                .into(),
            None => container(text("Waiting for camera"))
                .width(width)
                .height(height)
                .center_x(width)
                .center_y(height)
                .into(),
        };
        let overlay = canvas(OverlayCanvas::new(self.scene.clone()))
            .width(width)
            .height(height);

        let status = text(self.status.text()).size(14);
        let status = if self.status.is_error() {
            status.style(text::danger)
        } else {
            status
        };

        column![
            text(HEADING).size(24),
            status,
            stack![video, overlay],
        ]
        .spacing(12)
        .padding(16)
        .width(Length::Fill)
        .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.session.is_some() {
            iced::time::every(REFRESH_INTERVAL).map(|_| Message::Tick)
        } else if self.settings.appearance == Appearance::System {
            // repaint so the system theme is re-read
            iced::time::every(Duration::from_secs(2)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}
