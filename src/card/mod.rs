pub mod compose;
pub mod face_crop;
pub mod face_detection;
pub mod fonts;
pub mod orientation;
pub mod qr;
pub mod resize;
pub mod source;
pub mod vcard;

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::contacts::{output_filename, ContactRecord, ContactRow};
use crate::utils::{verbose_println, warn_println};
use compose::{CardStyle, CardText};
use face_crop::{crop_to_face, CropSettings};
use face_detection::{create_detector, FaceDetector};
use fonts::CardFonts;
use qr::QrSettings;
use source::{ImageLoad, ImageSource, FETCH_TIMEOUT};
use vcard::{normalize_phone, VCardFields};

pub const DEFAULT_BACKGROUND: &str = "#5046e3";
pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_CREATED_BY: &str = "QPass";
pub const DEFAULT_LOGO: &str = "assets/logo.png";
pub const DEFAULT_FONT_BOLD: &str = "Figtree-Bold.ttf";
pub const DEFAULT_FONT_REGULAR: &str = "Figtree-Regular.ttf";
pub const DEFAULT_FACE_MODEL: &str = "assets/seeta_fd_frontal_v1.0.bin";

/// Settings fixed for the whole run
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Logo path or URL, empty for none
    pub logo: String,
    /// Abort at startup if the logo cannot be loaded
    pub require_logo: bool,
    pub font_bold: String,
    pub font_regular: String,
    pub created_by: String,
    pub text_color: String,
    pub default_background: String,
    /// SeetaFace frontal model
    pub face_model: PathBuf,
    /// Abort at startup if the face model is missing; otherwise fall back to
    /// centered crops with a warning
    pub require_face_model: bool,
    pub qr: QrSettings,
    pub crop: CropSettings,
    pub fetch_timeout: Duration,
    pub parallel_jobs: usize,
    pub verbose: bool,
    pub dry_run: bool,
    pub skip_existing: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            logo: DEFAULT_LOGO.to_string(),
            require_logo: true,
            font_bold: DEFAULT_FONT_BOLD.to_string(),
            font_regular: DEFAULT_FONT_REGULAR.to_string(),
            created_by: DEFAULT_CREATED_BY.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            default_background: DEFAULT_BACKGROUND.to_string(),
            face_model: PathBuf::from(DEFAULT_FACE_MODEL),
            require_face_model: false,
            qr: QrSettings::default(),
            crop: CropSettings::default(),
            fetch_timeout: FETCH_TIMEOUT,
            parallel_jobs: num_cpus::get(),
            verbose: false,
            dry_run: false,
            skip_existing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Output file already exists and `skip_existing` is set
    OutputExists,
}

/// What happened to a record that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Rendered {
        has_profile: bool,
        face_found: bool,
        /// False in dry-run mode
        saved: bool,
    },
    Skipped(SkipReason),
}

/// Result of one dataset row
#[derive(Debug)]
pub struct CardResult {
    pub row: usize,
    pub name: String,
    /// Empty when the row could not be parsed
    pub output_path: PathBuf,
    pub duration: Duration,
    pub outcome: Result<CardOutcome>,
}

impl CardResult {
    pub fn is_rendered(&self) -> bool {
        matches!(self.outcome, Ok(CardOutcome::Rendered { .. }))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, Ok(CardOutcome::Skipped(_)))
    }

    pub fn face_found(&self) -> bool {
        matches!(self.outcome, Ok(CardOutcome::Rendered { face_found: true, .. }))
    }
}

/// In-memory card and what went into it
pub struct RenderedCard {
    pub image: RgbaImage,
    pub has_profile: bool,
    pub face_found: bool,
}

/// Loads the shared assets once and renders cards from contact records
pub struct CardEngine {
    config: RenderConfig,
    fonts: CardFonts,
    logo: Option<RgbaImage>,
    text_color: Rgba<u8>,
    default_background: Rgba<u8>,
    detector: Box<dyn FaceDetector>,
    source: ImageSource,
    pool: rayon::ThreadPool,
}

impl CardEngine {
    /// Validate the configuration and load fonts, logo and face model
    ///
    /// Any failure here aborts the run before a record is processed.
    pub fn new(config: RenderConfig) -> Result<Self> {
        let detector = create_detector(&config.face_model, config.require_face_model)?;
        Self::with_detector(config, detector)
    }

    /// Same as `new` with a caller supplied face detector
    pub fn with_detector(config: RenderConfig, detector: Box<dyn FaceDetector>) -> Result<Self> {
        let text_color = compose::parse_hex_color(&config.text_color)
            .with_context(|| format!("Invalid text color: {}", config.text_color))?;
        let default_background = compose::parse_hex_color(&config.default_background)
            .with_context(|| format!("Invalid default background: {}", config.default_background))?;

        let fonts = CardFonts::load(&config.font_bold, &config.font_regular)?;
        let source = ImageSource::new(config.fetch_timeout)?;
        let logo = load_logo(&source, &config)?;

        let qr_size = config.qr.image_size();
        if compose::qr_overlaps_text(qr_size) {
            warn_println(&format!(
                "QR code version {} is {}px tall and will cover the lower text lines",
                config.qr.version, qr_size
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_jobs.max(1))
            .build()
            .context("Failed to initialize thread pool")?;

        verbose_println(
            config.verbose,
            &format!(
                "Face detector: {}, logo: {}, jobs: {}",
                detector.name(),
                if logo.is_some() { "loaded" } else { "none" },
                config.parallel_jobs.max(1)
            ),
        );

        Ok(Self {
            config,
            fonts,
            logo,
            text_color,
            default_background,
            detector,
            source,
            pool,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Render one contact in memory
    ///
    /// A QR payload that does not fit or an invalid background colour fails
    /// the record. A missing profile photo does not.
    pub fn render_card(&self, record: &ContactRecord) -> Result<RenderedCard> {
        let background = if record.bg_color.trim().is_empty() {
            self.default_background
        } else {
            compose::parse_hex_color(&record.bg_color)
                .with_context(|| format!("Invalid background color '{}'", record.bg_color))?
        };

        let payload = vcard::encode(&VCardFields {
            name: &record.name,
            company: &record.company,
            email: &record.email,
            phone: &record.phone,
            title: &record.title,
            linkedin_url: &record.linkedin_url,
        });
        let qr = qr::render(&payload, &self.config.qr).context("Failed to encode contact QR code")?;

        let (profile, face_found) = self.profile_picture(record);
        let phone = normalize_phone(&record.phone);

        let text = CardText {
            title: &record.title,
            name: &record.name,
            email: &record.email,
            phone: &phone,
            created_by: &self.config.created_by,
        };
        let style = CardStyle {
            background,
            text: self.text_color,
        };

        let image = compose::compose(&text, &style, &self.fonts, self.logo.as_ref(), profile.as_ref(), &qr)?;

        Ok(RenderedCard {
            image,
            has_profile: profile.is_some(),
            face_found,
        })
    }

    /// Render one contact and write it to `output_path`
    pub fn render_to_file(&self, record: &ContactRecord, output_path: &Path) -> Result<CardOutcome> {
        self.write_card(record, output_path, output_path.exists())
    }

    /// `existed_before_run` is whether the file was there before this run
    /// started, so cards written earlier in the same batch are never skipped
    fn write_card(&self, record: &ContactRecord, output_path: &Path, existed_before_run: bool) -> Result<CardOutcome> {
        if self.config.skip_existing && existed_before_run {
            verbose_println(
                self.config.verbose,
                &format!("Skipping {}: output already exists", output_path.display()),
            );
            return Ok(CardOutcome::Skipped(SkipReason::OutputExists));
        }

        let card = self.render_card(record)?;

        if self.config.dry_run {
            verbose_println(
                self.config.verbose,
                &format!("Dry run: would write {}", output_path.display()),
            );
        } else {
            compose::save(&card.image, output_path)?;
            verbose_println(self.config.verbose, &format!("Saved {}", output_path.display()));
        }

        Ok(CardOutcome::Rendered {
            has_profile: card.has_profile,
            face_found: card.face_found,
            saved: !self.config.dry_run,
        })
    }

    /// Render every row into `output_dir`
    ///
    /// Rows run in parallel, except rows sharing an output file, which run in
    /// input order so the last one wins. Failures are logged and recorded;
    /// they never stop the batch. Results come back in row order.
    pub fn process_batch<F>(&self, rows: &[ContactRow], output_dir: &Path, progress_callback: F) -> Vec<CardResult>
    where
        F: Fn(usize, &CardResult) + Send + Sync,
    {
        let groups = group_by_output(rows, output_dir);
        let processed_count = AtomicUsize::new(0);

        // Snapshot before any card is written
        let preexisting: HashSet<PathBuf> = groups
            .iter()
            .filter_map(|group| group.first().map(|(_, path)| path))
            .filter(|path| !path.as_os_str().is_empty() && path.exists())
            .cloned()
            .collect();

        let mut results: Vec<CardResult> = self.pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    group
                        .iter()
                        .map(|&(index, ref output_path)| {
                            let existed = preexisting.contains(output_path);
                            let result = self.process_row(&rows[index], output_path, existed);
                            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                            progress_callback(count, &result);
                            result
                        })
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
                .into_iter()
                .flatten()
                .collect()
        });

        results.sort_by_key(|r| r.row);
        results
    }

    fn process_row(&self, row: &ContactRow, output_path: &Path, existed_before_run: bool) -> CardResult {
        let start = Instant::now();

        let (name, outcome) = match &row.record {
            Ok(record) => {
                verbose_println(self.config.verbose, &format!("Row {}: rendering card for {}", row.row, record.name));
                let outcome = self
                    .write_card(record, output_path, existed_before_run)
                    .with_context(|| format!("Row {} ({})", row.row, record.name));
                (record.name.clone(), outcome)
            }
            Err(message) => (
                String::new(),
                Err(anyhow::anyhow!("Row {}: could not parse record: {}", row.row, message)),
            ),
        };

        if let Err(e) = &outcome {
            warn_println(&format!("Skipping row {}: {:#}", row.row, e));
        }

        CardResult {
            row: row.row,
            name,
            output_path: output_path.to_path_buf(),
            duration: start.elapsed(),
            outcome,
        }
    }

    /// Resolve and crop the record's photo; absence leaves the slot blank
    fn profile_picture(&self, record: &ContactRecord) -> (Option<RgbaImage>, bool) {
        let owner = format!("{}'s profile image", record.name);
        let photo = match self.source.resolve(&record.profile_image, &owner) {
            ImageLoad::Loaded(img) => img,
            ImageLoad::Absent(_) => return (None, false),
        };

        match crop_to_face(&photo, self.detector.as_ref(), &self.config.crop) {
            Ok(crop) => {
                verbose_println(
                    self.config.verbose,
                    &format!(
                        "{}: {} crop at ({}, {}) {}x{}",
                        record.name,
                        if crop.face_found { "face" } else { "centered" },
                        crop.region.x,
                        crop.region.y,
                        crop.region.width,
                        crop.region.height
                    ),
                );
                (Some(crop.image), crop.face_found)
            }
            Err(e) => {
                warn_println(&format!("Could not crop {}: {:#}", owner, e));
                (None, false)
            }
        }
    }
}

/// Load the logo once; it is scaled to card size up front
fn load_logo(source: &ImageSource, config: &RenderConfig) -> Result<Option<RgbaImage>> {
    match source.resolve(&config.logo, "logo") {
        ImageLoad::Loaded(img) => {
            let scaled = resize::resize_to_width(&img, compose::LOGO_WIDTH, resize::ResizeFilter::Lanczos)
                .context("Failed to scale logo")?;
            Ok(Some(scaled))
        }
        ImageLoad::Absent(reason) if config.require_logo => {
            Err(anyhow::anyhow!("Logo '{}' unavailable: {}", config.logo, reason))
        }
        ImageLoad::Absent(_) => Ok(None),
    }
}

/// Partition row indices by output file, keeping first-appearance order of
/// files and input order within each file. Unparseable rows get a group of
/// their own.
fn group_by_output(rows: &[ContactRow], output_dir: &Path) -> Vec<Vec<(usize, PathBuf)>> {
    let mut groups: Vec<Vec<(usize, PathBuf)>> = Vec::new();
    let mut by_path: HashMap<PathBuf, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        match &row.record {
            Ok(record) => {
                let path = output_dir.join(output_filename(&record.name));
                match by_path.get(&path) {
                    Some(&group) => groups[group].push((index, path)),
                    None => {
                        by_path.insert(path.clone(), groups.len());
                        groups.push(vec![(index, path)]);
                    }
                }
            }
            Err(_) => groups.push(vec![(index, PathBuf::new())]),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(row: usize, name: &str) -> ContactRow {
        ContactRow {
            row,
            record: Ok(ContactRecord {
                name: name.to_string(),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_group_by_output_keeps_duplicates_together() {
        let rows = vec![
            row(1, "Jane Doe"),
            row(2, "John Roe"),
            row(3, "Jane Doe"),
            ContactRow {
                row: 4,
                record: Err("bad".to_string()),
            },
            row(5, "Jane_Doe"),
        ];

        let groups = group_by_output(&rows, Path::new("out"));

        assert_eq!(groups.len(), 3);
        let indices: Vec<Vec<usize>> = groups.iter().map(|g| g.iter().map(|(i, _)| *i).collect()).collect();
        assert_eq!(indices, vec![vec![0, 2, 4], vec![1], vec![3]]);
        assert_eq!(groups[0][0].1, Path::new("out").join("Jane_Doe_card.png"));
        assert_eq!(groups[2][0].1, PathBuf::new());
    }

    #[test]
    fn test_default_render_config() {
        let config = RenderConfig::default();
        assert_eq!(config.default_background, "#5046e3");
        assert_eq!(config.text_color, "#FFFFFF");
        assert_eq!(config.created_by, "QPass");
        assert_eq!(config.qr, QrSettings::default());
        assert_eq!(config.crop, CropSettings::default());
        assert_eq!(config.face_model, PathBuf::from("assets/seeta_fd_frontal_v1.0.bin"));
        assert!(!config.require_face_model);
        assert!(config.parallel_jobs >= 1);
        assert!(!config.skip_existing);
    }

    #[test]
    fn test_invalid_colors_are_configuration_errors() {
        let config = RenderConfig {
            text_color: "white".to_string(),
            ..Default::default()
        };
        assert!(CardEngine::new(config).is_err());

        let config = RenderConfig {
            default_background: "#12345".to_string(),
            ..Default::default()
        };
        assert!(CardEngine::new(config).is_err());
    }

    #[test]
    fn test_missing_font_is_configuration_error() {
        let config = RenderConfig {
            font_bold: "/nonexistent/Bold.ttf".to_string(),
            logo: String::new(),
            require_logo: false,
            ..Default::default()
        };
        assert!(CardEngine::new(config).is_err());
    }
}
