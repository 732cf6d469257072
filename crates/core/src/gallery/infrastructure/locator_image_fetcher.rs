use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::gallery::domain::image_fetcher::ImageFetcher;
use crate::shared::frame::Frame;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {locator} failed: {source}")]
    Request {
        locator: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request for {locator} failed: HTTP {status}")]
    Status { locator: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {locator}: {source}")]
    Decode {
        locator: String,
        #[source]
        source: image::ImageError,
    },
}

/// Fetches reference images from `http(s)://` URIs, `file://` URIs or paths.
///
/// Relative paths resolve against `base_dir` (usually the roster's directory).
pub struct LocatorImageFetcher {
    base_dir: Option<PathBuf>,
    client: reqwest::blocking::Client,
}

impl LocatorImageFetcher {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {e}");
                reqwest::blocking::Client::new()
            });
        Self { base_dir, client }
    }

    fn read_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        if is_http(locator) {
            return self.download(locator);
        }
        let path = self.resolve_path(locator);
        std::fs::read(&path).map_err(|e| FetchError::Read { path, source: e })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let request_error = |e| FetchError::Request {
            locator: url.to_string(),
            source: e,
        };
        let response = self.client.get(url).send().map_err(request_error)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                locator: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response.bytes().map_err(request_error)?;
        Ok(bytes.to_vec())
    }

    fn resolve_path(&self, locator: &str) -> PathBuf {
        let path = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageFetcher for LocatorImageFetcher {
    fn fetch(&self, locator: &str) -> Result<Frame, Box<dyn std::error::Error>> {
        let bytes = self.read_bytes(locator)?;
        let image = image::load_from_memory(&bytes).map_err(|e| FetchError::Decode {
            locator: locator.to_string(),
            source: e,
        })?;
        Ok(Frame::from_rgb_image(image.to_rgb8(), 0))
    }
}

fn is_http(locator: &str) -> bool {
    let lower = locator.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(4, 3, image::Rgb([200, 100, 50]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_fetches_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "alice.png");
        let frame = LocatorImageFetcher::new(None)
            .fetch(path.to_str().unwrap())
            .unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (4, 3, 3));
        assert_eq!(&frame.data()[..3], &[200, 100, 50]);
    }

    #[test]
    fn test_fetches_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "bob.png");
        let uri = format!("file://{}", path.display());
        let frame = LocatorImageFetcher::new(None).fetch(&uri).unwrap();
        assert_eq!(frame.width(), 4);
    }

    #[test]
    fn test_relative_path_resolves_against_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "carol.png");
        let fetcher = LocatorImageFetcher::new(Some(dir.path().to_path_buf()));
        assert!(fetcher.fetch("carol.png").is_ok());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = LocatorImageFetcher::new(Some(dir.path().to_path_buf()));
        let err = fetcher.fetch("absent.png").unwrap_err();
        assert!(err.to_string().contains("absent.png"));
        assert!(err.downcast_ref::<FetchError>().is_some());
    }

    #[test]
    fn test_non_image_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = LocatorImageFetcher::new(None)
            .fetch(path.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::Decode { .. })
        ));
    }

    #[test]
    fn test_is_http() {
        assert!(is_http("https://example.com/a.jpg"));
        assert!(is_http("HTTP://example.com/a.jpg"));
        assert!(!is_http("file:///tmp/a.jpg"));
        assert!(!is_http("images/a.jpg"));
    }
}
