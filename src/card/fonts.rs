use ab_glyph::{Font, FontArc, FontVec, PxScale};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// The two faces used on a card
#[derive(Clone)]
pub struct CardFonts {
    pub bold: FontArc,
    pub regular: FontArc,
}

impl CardFonts {
    /// Load both faces. A missing font aborts the run before any card is drawn.
    pub fn load(bold_spec: &str, regular_spec: &str) -> Result<Self> {
        let bold = load_font(bold_spec).with_context(|| format!("Bold font unavailable: {}", bold_spec))?;
        let regular =
            load_font(regular_spec).with_context(|| format!("Regular font unavailable: {}", regular_spec))?;

        Ok(Self { bold, regular })
    }
}

/// Pixel scale for a font size given in em pixels
///
/// ab_glyph scales by ascent-descent height, so the size is converted to keep
/// the em square `size` pixels tall.
pub fn em_scale(font: &impl Font, size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(size * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(size),
    }
}

/// Load a font from a specification
///
/// Supports three formats:
/// 1. Path: "assets/Figtree-Bold.ttf" or "/usr/share/fonts/X.ttf" -> loads directly
/// 2. Font filename: "Figtree-Bold.ttf" -> searched in the system font directories
/// 3. Font name: "Figtree-Bold" -> searched as name.ttf / name.otf
pub fn load_font(font_spec: &str) -> Result<FontArc> {
    let direct = Path::new(font_spec);
    if direct.is_file() {
        return load_font_from_path(direct);
    }

    if is_absolute_path(font_spec) {
        return Err(anyhow::anyhow!("Font file not found at path: {}", font_spec));
    }

    let candidates: Vec<String> = if is_font_filename(font_spec) {
        vec![font_spec.to_string()]
    } else {
        vec![format!("{}.ttf", font_spec), format!("{}.otf", font_spec)]
    };

    for candidate in &candidates {
        if let Some(path) = find_in_font_directories(candidate) {
            return load_font_from_path(&path);
        }
    }

    Err(anyhow::anyhow!(
        "Font '{}' not found. Specify a font file path or install the font.",
        font_spec
    ))
}

/// Check if the input is an absolute path
fn is_absolute_path(path: &str) -> bool {
    path.starts_with('/') ||                           // Unix/Linux/macOS absolute path
    path.starts_with('\\') ||                          // Windows UNC path
    (path.len() > 2 && path.chars().nth(1) == Some(':')) // Windows drive path (C:, D:, etc.)
}

/// Check if the input looks like a font filename
fn is_font_filename(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.ends_with(".ttf") || lower.ends_with(".otf") || lower.ends_with(".ttc")
}

fn load_font_from_path(font_path: &Path) -> Result<FontArc> {
    let font_data = std::fs::read(font_path)
        .with_context(|| format!("Failed to read font file: {}", font_path.display()))?;

    let font = FontVec::try_from_vec(font_data)
        .with_context(|| format!("Failed to parse font file: {}", font_path.display()))?;

    Ok(FontArc::new(font))
}

/// Case-insensitive search for a font file below the system font directories
fn find_in_font_directories(filename: &str) -> Option<PathBuf> {
    let wanted = filename.to_lowercase();

    for dir in get_system_font_directories() {
        let dir = expand_path(dir);
        if !Path::new(&dir).is_dir() {
            continue;
        }

        let found = WalkDir::new(&dir)
            .follow_links(true)
            .max_depth(4)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.file_type().is_file()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| name.to_lowercase() == wanted)
                        .unwrap_or(false)
            });

        if let Some(entry) = found {
            return Some(entry.into_path());
        }
    }

    None
}

/// Expand paths with ~ to home directory
fn expand_path(path: &str) -> String {
    if path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

/// Local asset folder first, then the usual system font directories
fn get_system_font_directories() -> Vec<&'static str> {
    vec![
        "assets/fonts",
        "fonts",
        // macOS
        "/System/Library/Fonts",
        "/Library/Fonts",
        "~/Library/Fonts",
        // Linux
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "~/.fonts",
        "~/.local/share/fonts",
        // Windows (via WSL)
        "/mnt/c/Windows/Fonts",
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// DejaVu fonts bundled with the test fixtures
    pub(crate) fn fixture_font(bold: bool) -> PathBuf {
        let file = if bold { "DejaVuSans-Bold.ttf" } else { "DejaVuSans.ttf" };
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/fonts").join(file)
    }

    #[test]
    fn test_is_absolute_path() {
        assert!(is_absolute_path("/usr/share/fonts/font.ttf"));
        assert!(is_absolute_path("C:\\Windows\\Fonts\\arial.ttf"));
        assert!(is_absolute_path("\\\\server\\share\\fonts\\font.ttf"));

        assert!(!is_absolute_path("Figtree-Bold.ttf"));
        assert!(!is_absolute_path("assets/fonts/Figtree-Bold.ttf"));
    }

    #[test]
    fn test_is_font_filename() {
        assert!(is_font_filename("Figtree-Bold.ttf"));
        assert!(is_font_filename("Figtree-Bold.TTF"));
        assert!(is_font_filename("font.otf"));
        assert!(!is_font_filename("Figtree-Bold"));
        assert!(!is_font_filename("font.txt"));
    }

    #[test]
    fn test_expand_path_leaves_plain_paths() {
        assert_eq!(expand_path("/usr/share/fonts"), "/usr/share/fonts");
        assert_eq!(expand_path("relative/path"), "relative/path");
    }

    #[test]
    fn test_card_fonts_load_both_faces() {
        let bold = fixture_font(true);
        let regular = fixture_font(false);
        assert!(CardFonts::load(bold.to_str().unwrap(), regular.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_missing_font_is_an_error() {
        assert!(load_font("/nonexistent/NoSuchFont.ttf").is_err());
        assert!(load_font("NoSuchFontFamilyAnywhere-Bold").is_err());
        assert!(CardFonts::load("/nonexistent/a.ttf", "/nonexistent/b.ttf").is_err());
    }

    #[test]
    fn test_load_font_from_path() {
        let path = fixture_font(false);
        let font = load_font(path.to_str().unwrap()).unwrap();
        let scale = em_scale(&font, 22.0);
        assert!(scale.y > 0.0);
    }
}
