use std::path::PathBuf;

use crate::camera::infrastructure::ffmpeg_camera::FfmpegCamera;
use crate::gallery::infrastructure::locator_image_fetcher::LocatorImageFetcher;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::pipeline::pass_logger::PassLogger;
use crate::pipeline::session::{AnalyzerLoader, RosterSource, SessionConfig, SessionParts};
use crate::recognition::domain::face_analyzer::FaceAnalyzer;
use crate::recognition::infrastructure::model_loader::{self, ModelSource};

/// ONNX models, ffmpeg camera and the locator fetcher, wired for `config`.
///
/// Callers pick the overlay and logger; the camera can be swapped afterwards.
pub fn default_session_parts(
    config: &SessionConfig,
    overlay: Box<dyn OverlaySurface>,
    logger: Box<dyn PassLogger>,
) -> SessionParts {
    SessionParts {
        analyzer_loader: onnx_analyzer_loader(config.model_source.clone()),
        camera: Box::new(FfmpegCamera::new(config.camera_device.clone())),
        fetcher: Box::new(LocatorImageFetcher::new(roster_base_dir(&config.roster))),
        overlay,
        logger,
    }
}

pub fn onnx_analyzer_loader(source: ModelSource) -> AnalyzerLoader {
    Box::new(move || {
        let analyzer = model_loader::load_models(&source)?;
        Ok(Box::new(analyzer) as Box<dyn FaceAnalyzer>)
    })
}

/// Directory relative reference images resolve against.
pub fn roster_base_dir(roster: &RosterSource) -> Option<PathBuf> {
    match roster {
        RosterSource::File(path) => path.parent().map(|p| p.to_path_buf()),
        RosterSource::Loaded(_) => None,
    }
}
