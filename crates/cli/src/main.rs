use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use facestamp_core::camera::domain::video_surface::VideoSurface;
use facestamp_core::camera::infrastructure::still_image_camera::StillImageCamera;
use facestamp_core::overlay::infrastructure::image_overlay::ImageOverlay;
use facestamp_core::pipeline::infrastructure::default_session_parts::default_session_parts;
use facestamp_core::pipeline::pass_logger::StdoutPassLogger;
use facestamp_core::pipeline::session::{
    RosterSource, Session, SessionConfig, SessionEvent, SessionFailure, SessionHandle,
    SessionState,
};
use facestamp_core::recognition::infrastructure::model_loader::ModelSource;
use facestamp_core::shared::constants::{DEFAULT_MATCH_THRESHOLD, IMAGE_EXTENSIONS};

/// Live face recognition: labels faces seen by a camera against a roster.
#[derive(Parser)]
#[command(name = "facestamp")]
struct Cli {
    /// Roster JSON file: [{ "name": ..., "img": [...] }, ...].
    #[arg(long)]
    roster: PathBuf,

    /// Maximum descriptor distance accepted as a match.
    ///
    /// Descriptors are unit length, so the default 0.49 only accepts faces
    /// with cosine similarity of about 0.88 or more. Live camera faces often
    /// need a looser value such as 1.0 (cosine 0.5).
    #[arg(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    threshold: f64,

    /// Milliseconds between recognition passes.
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Capture device (e.g. /dev/video0, "0" on macOS, "video=<name>" on Windows).
    #[arg(long)]
    camera: Option<String>,

    /// Use a still image instead of the camera.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Stop after this many passes (runs until killed otherwise).
    #[arg(long)]
    passes: Option<usize>,

    /// Write the last frame with face boxes to this image file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Directory searched for model files before the user cache.
    #[arg(long)]
    model_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = SessionConfig {
        roster: RosterSource::File(cli.roster.clone()),
        model_source: ModelSource::from_env().with_model_dir(cli.model_dir.clone()),
        threshold: cli.threshold,
        poll_interval: Duration::from_millis(cli.interval_ms),
        camera_device: cli.camera.clone(),
        max_passes: cli.passes,
        ..SessionConfig::default()
    };

    let overlay = ImageOverlay::new(config.display_size);
    let mut parts = default_session_parts(
        &config,
        Box::new(overlay.clone()),
        Box::new(StdoutPassLogger::default()),
    );
    if let Some(image) = &cli.image {
        parts.camera = Box::new(StillImageCamera::new(image.clone()));
    }

    let poll_interval = config.poll_interval;
    let handle = Session::start(config, parts)?;
    let video = handle.video_surface();
    let failure = watch(&handle, &overlay, poll_interval);
    handle.wait();

    if let Some(path) = &cli.snapshot {
        write_snapshot(path, &overlay, &video)?;
    }
    match failure {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

/// Logs session events and label changes until the session ends.
fn watch(
    handle: &SessionHandle,
    overlay: &ImageOverlay,
    poll_interval: Duration,
) -> Option<SessionFailure> {
    let mut failure = None;
    let mut last_labels: Vec<String> = Vec::new();

    loop {
        match handle.events().recv_timeout(poll_interval) {
            Ok(SessionEvent::State(state)) => {
                log::info!("Status: {}", state.status_text());
                if let SessionState::Failed(f) = state {
                    failure = Some(f);
                }
            }
            Ok(SessionEvent::Gallery(report)) => {
                for skipped in &report.skipped {
                    log::debug!(
                        "Skipped {} for {}: {}",
                        skipped.locator,
                        skipped.identity,
                        skipped.reason
                    );
                }
                log::info!(
                    "Reference gallery: {} identities, {} descriptors",
                    report.sets.len(),
                    report.descriptor_count()
                );
            }
            Ok(SessionEvent::Stopped(stats)) => {
                log::info!(
                    "Stopped after {} passes ({} failed, {} skipped ticks)",
                    stats.passes,
                    stats.failed_passes,
                    stats.skipped_ticks
                );
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let labels = overlay.labels();
        if labels != last_labels {
            if labels.is_empty() {
                log::info!("No faces");
            } else {
                log::info!("Faces: {}", labels.join(", "));
            }
            last_labels = labels;
        }
    }

    failure
}

fn write_snapshot(
    path: &Path,
    overlay: &ImageOverlay,
    video: &VideoSurface,
) -> Result<(), Box<dyn std::error::Error>> {
    let frame = video.current_frame();
    if frame.is_none() {
        log::warn!("No camera frame captured; snapshot shows boxes only");
    }
    overlay.render(frame.as_ref()).save(path)?;
    log::info!("Snapshot written to {}", path.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.roster.exists() {
        return Err(format!("Roster file not found: {}", cli.roster.display()).into());
    }
    if !cli.threshold.is_finite() || cli.threshold < 0.0 {
        return Err(format!(
            "Threshold must be a non-negative number, got {}",
            cli.threshold
        )
        .into());
    }
    if cli.interval_ms == 0 {
        return Err("Interval must be at least 1 ms".into());
    }
    if cli.passes == Some(0) {
        return Err("Passes must be at least 1".into());
    }
    if let Some(image) = &cli.image {
        if !image.exists() {
            return Err(format!("Image file not found: {}", image.display()).into());
        }
        if !is_image(image) {
            return Err(format!("Unsupported image type: {}", image.display()).into());
        }
        if cli.camera.is_some() {
            return Err("--image and --camera are mutually exclusive".into());
        }
    }
    if let Some(snapshot) = &cli.snapshot {
        if !is_image(snapshot) {
            return Err(format!(
                "Snapshot must have an image extension ({}), got {}",
                IMAGE_EXTENSIONS.join(", "),
                snapshot.display()
            )
            .into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["facestamp"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    fn roster_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[]").unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let parsed = cli(&["--roster", "people.json"]);
        assert_eq!(parsed.threshold, DEFAULT_MATCH_THRESHOLD);
        assert_eq!(parsed.interval_ms, 100);
        assert!(parsed.passes.is_none());
    }

    #[test]
    fn test_accepts_valid_arguments() {
        let roster = roster_file();
        let parsed = cli(&[
            "--roster",
            roster.path().to_str().unwrap(),
            "--threshold",
            "0.6",
            "--passes",
            "5",
            "--snapshot",
            "out.png",
        ]);
        assert!(validate(&parsed).is_ok());
    }

    #[test]
    fn test_rejects_missing_roster() {
        let parsed = cli(&["--roster", "/definitely/not/here.json"]);
        assert!(validate(&parsed)
            .unwrap_err()
            .to_string()
            .contains("Roster file not found"));
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let roster = roster_file();
        let parsed = cli(&[
            "--roster",
            roster.path().to_str().unwrap(),
            "--threshold=-1",
        ]);
        assert!(validate(&parsed).is_err());
    }

    #[test]
    fn test_rejects_zero_passes_and_interval() {
        let roster = roster_file();
        let path = roster.path().to_str().unwrap();
        assert!(validate(&cli(&["--roster", path, "--passes", "0"])).is_err());
        assert!(validate(&cli(&["--roster", path, "--interval-ms", "0"])).is_err());
    }

    #[test]
    fn test_rejects_non_image_snapshot() {
        let roster = roster_file();
        let parsed = cli(&[
            "--roster",
            roster.path().to_str().unwrap(),
            "--snapshot",
            "out.txt",
        ]);
        assert!(validate(&parsed).is_err());
    }

    #[test]
    fn test_threshold_help_explains_scale() {
        use clap::CommandFactory;
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("cosine similarity of about 0.88"));
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("a.JPG")));
        assert!(is_image(Path::new("a.png")));
        assert!(!is_image(Path::new("a.mp4")));
        assert!(!is_image(Path::new("noext")));
    }
}
