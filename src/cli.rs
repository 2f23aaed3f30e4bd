use clap::Parser;
use std::path::PathBuf;

use crate::card::qr::{ErrorCorrection, QrSettings};
use crate::card::{
    RenderConfig, DEFAULT_BACKGROUND, DEFAULT_CREATED_BY, DEFAULT_FACE_MODEL, DEFAULT_FONT_BOLD, DEFAULT_FONT_REGULAR,
    DEFAULT_LOGO, DEFAULT_TEXT_COLOR,
};

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "contact-card-generator",
    version,
    about = "Batch generator of contact card images with vCard QR codes",
    long_about = "
Contact Card Generator

Reads a CSV contact list and renders one 600x800 PNG business card per row:
background colour, logo, contact details, a vCard QR code and a circular
profile photo cropped around the detected face.

Required CSV columns: Name, Job Title, Email, Phone, Company, bg_color
Optional CSV columns: \"Profile image path or url\", linkedinUrl

Example Usage:
  # Render every contact into ./cards
  contact-card-generator -i contacts.csv -o cards

  # Face-aware profile crops with a SeetaFace model
  contact-card-generator -i contacts.csv -o cards --face-model seeta_fd_frontal_v1.0.bin

  # Custom assets and colours
  contact-card-generator -i contacts.csv --logo https://example.com/logo.png \\
    --font-bold Inter-Bold --font-regular Inter-Regular --text-color '#000'

  # Settings from a JSON file (command-line values win)
  contact-card-generator --config cards.json

  # One card, prompting for each field
  contact-card-generator --interactive

  # Larger QR grid for long vCards
  contact-card-generator -i contacts.csv --qr-version 10 --qr-error-correction medium

  # Check the dataset without writing files
  contact-card-generator -i contacts.csv --dry-run --report --verbose"
)]
pub struct Args {
    /// CSV contact dataset
    #[arg(short = 'i', long = "input", value_name = "CSV")]
    pub input: Option<PathBuf>,

    /// Output directory for the rendered cards [default: .]
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Prompt for a single contact on the terminal and render one card
    #[arg(long = "interactive", conflicts_with = "input")]
    pub interactive: bool,

    /// JSON configuration file (command-line arguments take precedence)
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Logo image path or URL [default: assets/logo.png]
    #[arg(long = "logo", value_name = "PATH|URL")]
    pub logo: Option<String>,

    /// Bold font specification. Supports three formats:
    /// - Font name: "Figtree-Bold" (searches system fonts)
    /// - Font filename: "Figtree-Bold.ttf" (searches in font directories)
    /// - Full path: "/usr/share/fonts/Figtree-Bold.ttf" (loads directly)
    #[arg(long = "font-bold", value_name = "FONT")]
    pub font_bold: Option<String>,

    /// Regular font specification, same formats as --font-bold
    #[arg(long = "font-regular", value_name = "FONT")]
    pub font_regular: Option<String>,

    /// Value printed under "CARD CREATED BY" [default: QPass]
    #[arg(long = "created-by", value_name = "TEXT")]
    pub created_by: Option<String>,

    /// Text colour (hex, e.g. #FFFFFF)
    #[arg(long = "text-color", value_name = "COLOR")]
    pub text_color: Option<String>,

    /// Background used when a row has no bg_color (hex, e.g. #5046e3)
    #[arg(long = "default-background", value_name = "COLOR")]
    pub default_background: Option<String>,

    /// SeetaFace frontal face model [default: assets/seeta_fd_frontal_v1.0.bin].
    /// If the default model is missing, profile photos use a centered crop
    #[arg(long = "face-model", value_name = "FILE")]
    pub face_model: Option<PathBuf>,

    /// Number of parallel rendering jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "0", value_name = "N")]
    pub jobs: usize,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Render every card but write nothing to disk
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Leave cards that already exist untouched instead of overwriting them
    #[arg(long = "skip-existing")]
    pub skip_existing: bool,

    /// Display a table with the outcome of every row
    #[arg(long = "report")]
    pub report: bool,

    /// Emit progress and results as JSON lines on stdout
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// QR code version (1-40). The grid never grows to fit: version 5 at level
    /// high holds 44 bytes, so full vCards usually need a larger version or a
    /// lower level [default: 5]
    #[arg(long = "qr-version", value_name = "VERSION")]
    pub qr_version: Option<i16>,

    /// QR error correction level: low, medium, quartile or high [default: high]
    #[arg(long = "qr-error-correction", value_name = "LEVEL")]
    pub qr_error_correction: Option<ErrorCorrection>,
}

impl Args {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn logo(&self) -> &str {
        self.logo.as_deref().unwrap_or(DEFAULT_LOGO)
    }

    pub fn font_bold(&self) -> &str {
        self.font_bold.as_deref().unwrap_or(DEFAULT_FONT_BOLD)
    }

    pub fn font_regular(&self) -> &str {
        self.font_regular.as_deref().unwrap_or(DEFAULT_FONT_REGULAR)
    }

    pub fn created_by(&self) -> &str {
        self.created_by.as_deref().unwrap_or(DEFAULT_CREATED_BY)
    }

    pub fn text_color(&self) -> &str {
        self.text_color.as_deref().unwrap_or(DEFAULT_TEXT_COLOR)
    }

    pub fn default_background(&self) -> &str {
        self.default_background.as_deref().unwrap_or(DEFAULT_BACKGROUND)
    }

    pub fn face_model(&self) -> PathBuf {
        self.face_model
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FACE_MODEL))
    }

    pub fn parallel_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }

    pub fn qr_settings(&self) -> QrSettings {
        let defaults = QrSettings::default();
        QrSettings {
            version: self.qr_version.unwrap_or(defaults.version),
            error_correction: self.qr_error_correction.unwrap_or(defaults.error_correction),
        }
    }

    /// Immutable settings for the card engine
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            logo: self.logo().to_string(),
            require_logo: !self.interactive,
            font_bold: self.font_bold().to_string(),
            font_regular: self.font_regular().to_string(),
            created_by: self.created_by().to_string(),
            text_color: self.text_color().to_string(),
            default_background: self.default_background().to_string(),
            face_model: self.face_model(),
            // A model named by the user must load
            require_face_model: self.face_model.is_some(),
            qr: self.qr_settings(),
            parallel_jobs: self.parallel_jobs(),
            // stdout carries only JSON lines in --json-progress mode
            verbose: self.verbose && !self.json_progress,
            dry_run: self.dry_run,
            skip_existing: self.skip_existing,
            ..RenderConfig::default()
        }
    }
}
