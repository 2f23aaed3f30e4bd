use anyhow::{Context, Result};
use image::RgbaImage;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::orientation::{apply_rotation, read_exif_orientation};
use crate::utils::warn_println;

/// Network fetch timeout for remote images
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of resolving an image reference
///
/// Absence is an expected result, not an error: the card is still rendered
/// without that image.
#[derive(Debug)]
pub enum ImageLoad {
    Loaded(RgbaImage),
    Absent(AbsenceReason),
}

/// Why an image reference produced no image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbsenceReason {
    #[error("no image reference given")]
    Empty,
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("server answered with HTTP status {0}")]
    HttpStatus(u16),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("could not read image: {0}")]
    Io(String),
    #[error("could not decode image: {0}")]
    Decode(String),
}

/// Resolves local paths and HTTP(S) URLs to decoded RGBA images
pub struct ImageSource {
    client: reqwest::blocking::Client,
}

impl ImageSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Resolve a path or URL. Failures are logged, naming `owner` (what the
    /// image is for), and reported as absence.
    pub fn resolve(&self, reference: &str, owner: &str) -> ImageLoad {
        let reference = reference.trim();
        if reference.is_empty() {
            return ImageLoad::Absent(AbsenceReason::Empty);
        }

        let bytes = if is_url(reference) {
            self.fetch(reference)
        } else {
            read_file(Path::new(reference))
        };

        match bytes.and_then(|b| decode_image(&b)) {
            Ok(img) => ImageLoad::Loaded(img),
            Err(reason) => {
                warn_println(&format!("Could not load {} '{}': {}", owner, reference, reason));
                ImageLoad::Absent(reason)
            }
        }
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, AbsenceReason> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AbsenceReason::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AbsenceReason::HttpStatus(status.as_u16()));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| AbsenceReason::Transport(e.to_string()))
    }
}

/// True for references with an `http://` or `https://` scheme, any case
pub fn is_url(reference: &str) -> bool {
    let lower = reference.trim().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn read_file(path: &Path) -> Result<Vec<u8>, AbsenceReason> {
    if !path.exists() {
        return Err(AbsenceReason::NotFound(path.display().to_string()));
    }

    std::fs::read(path).map_err(|e| AbsenceReason::Io(e.to_string()))
}

/// Decode encoded bytes into an upright RGBA image
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, AbsenceReason> {
    let decoded = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AbsenceReason::Io(e.to_string()))?
        .decode()
        .map_err(|e| AbsenceReason::Decode(e.to_string()))?;

    Ok(apply_rotation(decoded.to_rgba8(), read_exif_orientation(bytes)))
}
