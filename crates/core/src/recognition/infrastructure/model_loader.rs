use std::path::{Path, PathBuf};

use crate::shared::constants::{
    DETECTION_MODEL_NAME, DETECTION_MODEL_URL, MODEL_DIR_ENV, RECOGNITION_MODEL_NAME,
    RECOGNITION_MODEL_URL,
};
use crate::shared::model_resolver;

use super::arcface_embedder::ArcFaceEmbedder;
use super::onnx_face_analyzer::OnnxFaceAnalyzer;
use super::onnx_face_detector::{OnnxFaceDetector, DEFAULT_CONFIDENCE};

/// Where model assets come from and how the detector is tuned.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSource {
    /// Searched before the user cache; `None` skips straight to the cache.
    pub model_dir: Option<PathBuf>,
    pub detection_confidence: f64,
}

impl Default for ModelSource {
    fn default() -> Self {
        Self {
            model_dir: None,
            detection_confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl ModelSource {
    /// Default source with the model directory taken from `FACESTAMP_MODEL_DIR`.
    pub fn from_env() -> Self {
        Self {
            model_dir: std::env::var_os(MODEL_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }

    /// An explicit directory wins over the environment.
    pub fn with_model_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.model_dir = dir;
        }
        self
    }

    fn model_dir(&self) -> Option<&Path> {
        self.model_dir.as_deref()
    }
}

/// Resolves both models and opens their sessions.
pub fn load_models(source: &ModelSource) -> Result<OnnxFaceAnalyzer, Box<dyn std::error::Error>> {
    let detection_path = model_resolver::resolve(
        DETECTION_MODEL_NAME,
        DETECTION_MODEL_URL,
        source.model_dir(),
        Some(download_progress(DETECTION_MODEL_NAME)),
    )?;
    let recognition_path = model_resolver::resolve(
        RECOGNITION_MODEL_NAME,
        RECOGNITION_MODEL_URL,
        source.model_dir(),
        Some(download_progress(RECOGNITION_MODEL_NAME)),
    )?;

    log::info!("Loading face detector from {}", detection_path.display());
    let detector = OnnxFaceDetector::new(&detection_path, source.detection_confidence)?;
    log::info!("Loading face recognizer from {}", recognition_path.display());
    let embedder = ArcFaceEmbedder::new(&recognition_path)?;

    Ok(OnnxFaceAnalyzer::new(detector, embedder))
}

fn download_progress(name: &'static str) -> model_resolver::ProgressFn {
    Box::new(move |downloaded, total| {
        if total > 0 {
            log::debug!("{name}: {downloaded}/{total} bytes");
        } else {
            log::debug!("{name}: {downloaded} bytes");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_model_dir_overrides() {
        let source = ModelSource::default().with_model_dir(Some(PathBuf::from("/models")));
        assert_eq!(source.model_dir(), Some(Path::new("/models")));
    }

    #[test]
    fn test_missing_override_keeps_existing_dir() {
        let source = ModelSource {
            model_dir: Some(PathBuf::from("/env")),
            ..ModelSource::default()
        }
        .with_model_dir(None);
        assert_eq!(source.model_dir(), Some(Path::new("/env")));
    }

    #[test]
    fn test_default_confidence() {
        assert_eq!(ModelSource::default().detection_confidence, DEFAULT_CONFIDENCE);
    }
}
