use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::Args;

/// Create a styled progress bar
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let template = ProgressStyle::with_template(
        "{spinner:.blue} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(template.progress_chars("#>-"));
    pb
}

/// Format duration in a human-readable way
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let mins = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", mins, secs)
    } else if total_secs > 0 {
        format!("{}.{:03}s", total_secs, millis)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Validate command line arguments after the config file is merged
pub fn validate_inputs(args: &Args) -> Result<()> {
    if !args.interactive {
        let input = args
            .input
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No contact file given. Use --input <CSV> or --interactive"))?;

        if !input.is_file() {
            return Err(anyhow::anyhow!("Input file does not exist: {}", input.display()));
        }
    }

    let output_dir = args.output_dir();
    if output_dir.exists() && !output_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Output path is not a directory: {}",
            output_dir.display()
        ));
    }

    // Validate job count
    if args.jobs > 32 {
        return Err(anyhow::anyhow!(
            "Job count too high (max 32), got: {}",
            args.jobs
        ));
    }

    for (label, color) in [
        ("text color", args.text_color()),
        ("default background", args.default_background()),
    ] {
        if !is_valid_hex_color(color) {
            return Err(anyhow::anyhow!(
                "Invalid {} format: '{}'. Expected hex format like #RRGGBB",
                label,
                color
            ));
        }
    }

    if let Some(model) = &args.face_model {
        if !model.is_file() {
            return Err(anyhow::anyhow!("Face model not found: {}", model.display()));
        }
    }

    let qr = args.qr_settings();
    if !(1..=40).contains(&qr.version) {
        return Err(anyhow::anyhow!("QR version must be between 1 and 40, got: {}", qr.version));
    }

    Ok(())
}

/// Check if a string is a valid hex color (with optional alpha)
pub fn is_valid_hex_color(color: &str) -> bool {
    let Some(hex_part) = color.trim().strip_prefix('#') else {
        return false;
    };

    // Accept #RGB, #RRGGBB, #RRGGBBAA formats
    match hex_part.len() {
        3 | 6 | 8 => hex_part.chars().all(|c| c.is_ascii_hexdigit()),
        _ => false,
    }
}

/// Generate a safe filename by replacing characters that are invalid on
/// common filesystems
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Print verbose information if verbose mode is enabled
pub fn verbose_println(verbose: bool, message: &str) {
    if verbose {
        println!("{} {}", style("[VERBOSE]").dim(), message);
    }
}

/// Print warning message
pub fn warn_println(message: &str) {
    eprintln!("{} {}", style("[WARNING]").yellow().bold(), message);
}

/// Print error message
pub fn error_println(message: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
    }

    #[test]
    fn test_is_valid_hex_color() {
        assert!(is_valid_hex_color("#000"));
        assert!(is_valid_hex_color("#5046e3"));
        assert!(is_valid_hex_color("#00000000"));
        assert!(is_valid_hex_color("#FF00FF80"));

        assert!(!is_valid_hex_color("000000"));
        assert!(!is_valid_hex_color("#GG0000"));
        assert!(!is_valid_hex_color("#00"));
        assert!(!is_valid_hex_color("#0000000000"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal.png"), "normal.png");
        assert_eq!(
            sanitize_filename("file/with\\bad:chars"),
            "file_with_bad_chars"
        );
        assert_eq!(sanitize_filename("file*with?quotes\""), "file_with_quotes_");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
        assert_eq!(sanitize_filename("Zoë"), "Zoë");
    }

    #[test]
    fn test_validate_inputs() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("contacts.csv");
        std::fs::write(&csv, "Name\n").unwrap();
        let csv = csv.to_str().unwrap();

        let args = Args::parse_from(["contact-card-generator", "-i", csv]);
        assert!(validate_inputs(&args).is_ok());

        let args = Args::parse_from(["contact-card-generator"]);
        assert!(validate_inputs(&args).is_err());

        let args = Args::parse_from(["contact-card-generator", "--interactive"]);
        assert!(validate_inputs(&args).is_ok());

        let args = Args::parse_from(["contact-card-generator", "-i", "/nonexistent/contacts.csv"]);
        assert!(validate_inputs(&args).is_err());

        let args = Args::parse_from(["contact-card-generator", "-i", csv, "--text-color", "white"]);
        assert!(validate_inputs(&args).is_err());

        let args = Args::parse_from(["contact-card-generator", "-i", csv, "-j", "64"]);
        assert!(validate_inputs(&args).is_err());

        let mut args = Args::parse_from(["contact-card-generator", "-i", csv]);
        args.qr_version = Some(41);
        assert!(validate_inputs(&args).is_err());
    }
}
