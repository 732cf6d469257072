pub const DETECTION_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const DETECTION_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const RECOGNITION_MODEL_NAME: &str = "w600k_r50.onnx";
pub const RECOGNITION_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Overrides the directory searched first for model assets.
pub const MODEL_DIR_ENV: &str = "FACESTAMP_MODEL_DIR";

pub const DISPLAY_WIDTH: u32 = 640;
pub const DISPLAY_HEIGHT: u32 = 488;

pub const POLL_INTERVAL_MS: u64 = 100;

/// Frames per second requested from capture devices.
pub const CAPTURE_FRAMERATE: u32 = 30;

/// Maximum descriptor distance still accepted as the same person. On unit
/// descriptors this is cosine similarity of about 0.88.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.49;

pub const UNKNOWN_LABEL: &str = "unknown";

pub const MODEL_LOAD_ATTEMPTS: usize = 2;
pub const CAMERA_OPEN_ATTEMPTS: usize = 3;
pub const RETRY_DELAY_MS: u64 = 500;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
