use anyhow::{Context, Result};
use image::GrayImage;
use std::io::Cursor;
use std::path::Path;

use crate::utils::warn_println;

/// Smallest face the detector reports, in pixels
pub const MIN_FACE_SIZE: u32 = 50;
/// Growth between two pyramid levels of the detection window
pub const SCALE_FACTOR: f32 = 1.1;
/// Classifier score a window needs to count as a face
pub const SCORE_THRESHOLD: f64 = 2.0;

/// Face bounding box in source image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Pluggable frontal face detector
pub trait FaceDetector: Send + Sync {
    /// Faces found in a luminance image, in the detector's own result order
    fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>>;

    /// Short name used in verbose output
    fn name(&self) -> &'static str;

    /// The face used for cropping: the first one the detector reported
    fn first_face(&self, gray: &GrayImage) -> Result<Option<FaceRegion>> {
        Ok(self.detect(gray)?.into_iter().next())
    }
}

/// SeetaFace cascade detector backed by rustface
///
/// The model bytes are kept in memory and a fresh detector is built per call,
/// because rustface detectors are stateful and need `&mut self`.
pub struct SeetaFaceDetector {
    model: Vec<u8>,
}

impl SeetaFaceDetector {
    /// Load a SeetaFace frontal model (e.g. `seeta_fd_frontal_v1.0.bin`)
    pub fn from_file(model_path: &Path) -> Result<Self> {
        let model = std::fs::read(model_path).with_context(|| {
            format!("Failed to read face model: {}", model_path.display())
        })?;

        // Parse once up front so a broken model is reported at startup
        rustface::read_model(Cursor::new(&model))
            .with_context(|| format!("Failed to parse face model: {}", model_path.display()))?;

        Ok(Self { model })
    }

    fn build_detector(&self) -> Result<Box<dyn rustface::Detector>> {
        let model = rustface::read_model(Cursor::new(&self.model))
            .context("Failed to parse face model")?;

        let mut detector = rustface::create_detector_with_model(model);
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(1.0 / SCALE_FACTOR);
        detector.set_slide_window_step(4, 4);
        Ok(detector)
    }
}

impl FaceDetector for SeetaFaceDetector {
    fn detect(&self, gray: &GrayImage) -> Result<Vec<FaceRegion>> {
        let (width, height) = gray.dimensions();
        if width < MIN_FACE_SIZE || height < MIN_FACE_SIZE {
            return Ok(Vec::new());
        }

        let mut detector = self.build_detector()?;
        let image = rustface::ImageData::new(gray.as_raw(), width, height);

        let faces = detector
            .detect(&image)
            .into_iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                }
            })
            .collect();

        Ok(faces)
    }

    fn name(&self) -> &'static str {
        "seetaface"
    }
}

/// Detector used when no face model is configured: never finds a face,
/// so every photo takes the centered-square path
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn detect(&self, _gray: &GrayImage) -> Result<Vec<FaceRegion>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Build the detector for a run
///
/// A model that is missing from disk is fatal only when `required` (the user
/// named it). Otherwise the run continues with centered crops and says so.
pub fn create_detector(model_path: &Path, required: bool) -> Result<Box<dyn FaceDetector>> {
    if !required && !model_path.is_file() {
        warn_println(&format!(
            "Face model not found at {}; profile photos will use centered crops",
            model_path.display()
        ));
        return Ok(Box::new(NoFaceDetector));
    }

    Ok(Box::new(SeetaFaceDetector::from_file(model_path)?))
}
