use crate::card::qr::ErrorCorrection;
use crate::cli::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// JSON configuration file, keys in camelCase
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub logo: Option<String>,
    pub font_bold: Option<String>,
    pub font_regular: Option<String>,
    pub created_by: Option<String>,
    pub text_color: Option<String>,
    pub default_background: Option<String>,
    pub face_model: Option<String>,
    pub jobs: Option<usize>,
    pub verbose: Option<bool>,
    pub dry_run: Option<bool>,
    pub skip_existing: Option<bool>,
    pub report: Option<bool>,
    pub qr_version: Option<i16>,
    pub qr_error_correction: Option<ErrorCorrection>,
}

impl Args {
    /// Load configuration from a JSON file and merge with command-line arguments
    /// Command-line arguments take precedence over config file values
    pub fn load_and_merge_config(&mut self) -> Result<()> {
        if let Some(config_path) = self.config_file.clone() {
            let contents = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: ConfigFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            self.merge_from_config(config);

            if self.verbose && !self.json_progress {
                eprintln!("Loaded configuration from: {:?}", config_path);
            }
        }
        Ok(())
    }

    /// Fill every value the command line left unset
    pub fn merge_from_config(&mut self, config: ConfigFile) {
        if self.input.is_none() && !self.interactive {
            self.input = config.input_path.map(PathBuf::from);
        }

        if self.output_dir.is_none() {
            self.output_dir = config.output_path.map(PathBuf::from);
        }

        if self.face_model.is_none() {
            self.face_model = config.face_model.map(PathBuf::from);
        }

        // String parameters
        fill(&mut self.logo, config.logo);
        fill(&mut self.font_bold, config.font_bold);
        fill(&mut self.font_regular, config.font_regular);
        fill(&mut self.created_by, config.created_by);
        fill(&mut self.text_color, config.text_color);
        fill(&mut self.default_background, config.default_background);

        fill(&mut self.qr_version, config.qr_version);
        fill(&mut self.qr_error_correction, config.qr_error_correction);

        if self.jobs == 0 {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        // Boolean flags - only apply if currently false (default)
        if !self.verbose {
            self.verbose = config.verbose.unwrap_or(false);
        }

        if !self.dry_run {
            self.dry_run = config.dry_run.unwrap_or(false);
        }

        if !self.skip_existing {
            self.skip_existing = config.skip_existing.unwrap_or(false);
        }

        if !self.report {
            self.report = config.report.unwrap_or(false);
        }
    }
}

fn fill<T>(target: &mut Option<T>, value: Option<T>) {
    if target.is_none() {
        *target = value;
    }
}
