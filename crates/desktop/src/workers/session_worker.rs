use std::time::Duration;

use facestamp_core::camera::domain::video_surface::VideoSurface;
use facestamp_core::overlay::infrastructure::overlay_scene::OverlayScene;
use facestamp_core::pipeline::infrastructure::default_session_parts::default_session_parts;
use facestamp_core::pipeline::pass_logger::NullPassLogger;
use facestamp_core::pipeline::session::{
    ConfigError, RosterSource, Session, SessionConfig, SessionEvent, SessionHandle,
};
use facestamp_core::recognition::infrastructure::model_loader::ModelSource;

use crate::settings::Settings;

/// A running recognition session plus the surfaces the window reads from.
pub struct LiveSession {
    handle: SessionHandle,
    pub scene: OverlayScene,
    pub video: VideoSurface,
}

impl LiveSession {
    /// Events received since the last call, without blocking.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.handle.events().try_iter().collect()
    }
}

pub fn session_config(settings: &Settings) -> Result<SessionConfig, String> {
    let roster = settings
        .resolved_roster_path()
        .ok_or("No configuration directory for the roster file")?;

    Ok(SessionConfig {
        roster: RosterSource::File(roster),
        model_source: ModelSource::from_env().with_model_dir(settings.model_dir.clone()),
        threshold: settings.threshold,
        poll_interval: Duration::from_millis(settings.poll_interval_ms),
        camera_device: settings.camera_device.clone(),
        ..SessionConfig::default()
    })
}

/// Starts model loading, gallery building and polling on background threads.
pub fn spawn(settings: &Settings) -> Result<LiveSession, String> {
    let config = session_config(settings)?;
    let scene = OverlayScene::new(config.display_size);
    let parts = default_session_parts(
        &config,
        Box::new(scene.clone()),
        Box::new(NullPassLogger),
    );

    let handle = Session::start(config, parts).map_err(|e: ConfigError| e.to_string())?;
    let video = handle.video_surface();
    Ok(LiveSession {
        handle,
        scene,
        video,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_carries_settings() {
        let settings = Settings {
            roster_path: Some(PathBuf::from("/data/roster.json")),
            threshold: 0.3,
            poll_interval_ms: 250,
            camera_device: Some("/dev/video1".into()),
            ..Settings::default()
        };
        let config = session_config(&settings).unwrap();

        assert_eq!(config.threshold, 0.3);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.camera_device.as_deref(), Some("/dev/video1"));
        assert!(matches!(
            config.roster,
            RosterSource::File(ref p) if p == &PathBuf::from("/data/roster.json")
        ));
        assert!(config.max_passes.is_none());
    }

    #[test]
    fn test_invalid_settings_do_not_start() {
        let settings = Settings {
            roster_path: Some(PathBuf::from("/data/roster.json")),
            threshold: -1.0,
            ..Settings::default()
        };
        assert!(spawn(&settings).is_err());
    }
}
