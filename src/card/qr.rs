use image::{ImageBuffer, Rgba, RgbaImage};
use qrcode::types::QrError as EncodeError;
use qrcode::{Color, EcLevel, QrCode, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Pixel size of one QR module
pub const BOX_SIZE: u32 = 8;
/// Quiet zone width in modules
pub const BORDER: u32 = 3;
/// Share of the module box covered by a gapped data module
pub const GAP_SIZE_RATIO: f32 = 0.8;

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// QR error correction level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    High,
}

impl ErrorCorrection {
    fn ec_level(self) -> EcLevel {
        match self {
            ErrorCorrection::Low => EcLevel::L,
            ErrorCorrection::Medium => EcLevel::M,
            ErrorCorrection::Quartile => EcLevel::Q,
            ErrorCorrection::High => EcLevel::H,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCorrection::Low => "low",
            ErrorCorrection::Medium => "medium",
            ErrorCorrection::Quartile => "quartile",
            ErrorCorrection::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l" | "low" => Ok(ErrorCorrection::Low),
            "m" | "medium" => Ok(ErrorCorrection::Medium),
            "q" | "quartile" => Ok(ErrorCorrection::Quartile),
            "h" | "high" => Ok(ErrorCorrection::High),
            other => Err(format!(
                "Invalid error correction level '{}'. Valid levels: low, medium, quartile, high",
                other
            )),
        }
    }
}

/// Fixed QR geometry for a run. The grid is never grown to fit the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrSettings {
    pub version: i16,
    pub error_correction: ErrorCorrection,
}

impl Default for QrSettings {
    fn default() -> Self {
        Self {
            version: 5,
            error_correction: ErrorCorrection::High,
        }
    }
}

impl QrSettings {
    /// Side length in pixels of a rendered code, quiet zone included
    pub fn image_size(&self) -> u32 {
        let modules = 17 + 4 * self.version.max(1) as u32;
        (modules + 2 * BORDER) * BOX_SIZE
    }
}

#[derive(Debug, Error)]
pub enum QrError {
    #[error("payload of {bytes} bytes does not fit QR version {version} with {level} error correction")]
    CapacityExceeded {
        bytes: usize,
        version: i16,
        level: ErrorCorrection,
    },
    #[error("QR encoding failed: {0}")]
    Encoding(String),
}

/// Encode `payload` into an opaque RGBA QR image
///
/// Data modules are drawn as gapped squares; the three finder patterns stay solid.
pub fn render(payload: &str, settings: &QrSettings) -> Result<RgbaImage, QrError> {
    let code = QrCode::with_version(
        payload.as_bytes(),
        Version::Normal(settings.version),
        settings.error_correction.ec_level(),
    )
    .map_err(|e| match e {
        EncodeError::DataTooLong => QrError::CapacityExceeded {
            bytes: payload.len(),
            version: settings.version,
            level: settings.error_correction,
        },
        other => QrError::Encoding(other.to_string()),
    })?;

    let modules = code.to_colors();
    let module_count = code.width() as u32;
    let size = (module_count + 2 * BORDER) * BOX_SIZE;

    let mut img: RgbaImage = ImageBuffer::from_pixel(size, size, LIGHT);
    let inset = gap_inset();

    for (y, row) in modules.chunks(module_count as usize).enumerate() {
        for (x, &module) in row.iter().enumerate() {
            if module != Color::Dark {
                continue;
            }

            let px = (x as u32 + BORDER) * BOX_SIZE;
            let py = (y as u32 + BORDER) * BOX_SIZE;
            let inset = if is_finder_module(x as u32, y as u32, module_count) {
                0
            } else {
                inset
            };

            fill_square(&mut img, px + inset, py + inset, BOX_SIZE - 2 * inset);
        }
    }

    Ok(img)
}

/// Pixels left blank on each side of a gapped module
fn gap_inset() -> u32 {
    ((1.0 - GAP_SIZE_RATIO) * BOX_SIZE as f32 / 2.0).round() as u32
}

/// True for modules belonging to one of the three 7x7 finder patterns
fn is_finder_module(x: u32, y: u32, width: u32) -> bool {
    (x < 7 && y < 7) || (x + 7 >= width && y < 7) || (x < 7 && y + 7 >= width)
}

fn fill_square(img: &mut RgbaImage, x: u32, y: u32, side: u32) {
    for dy in 0..side {
        for dx in 0..side {
            img.put_pixel(x + dx, y + dy, DARK);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_boundary_version5_high() {
        let settings = QrSettings::default();

        // Version 5-H holds 44 bytes in byte mode
        let fits = "a".repeat(44);
        assert!(render(&fits, &settings).is_ok());

        let overflow = "a".repeat(45);
        match render(&overflow, &settings) {
            Err(QrError::CapacityExceeded { bytes, version, level }) => {
                assert_eq!(bytes, 45);
                assert_eq!(version, 5);
                assert_eq!(level, ErrorCorrection::High);
            }
            other => panic!("expected capacity error, got {:?}", other.map(|i| i.dimensions())),
        }
    }

    #[test]
    fn test_fixed_image_size() {
        let settings = QrSettings::default();
        let short = render("hi", &settings).unwrap();
        let long = render(&"z".repeat(40), &settings).unwrap();

        // 37 modules + 2 * 3 border, 8 px each
        assert_eq!(settings.image_size(), 344);
        assert_eq!(short.dimensions(), (344, 344));
        assert_eq!(long.dimensions(), (344, 344));
    }

    #[test]
    fn test_module_centers_match_code() {
        let settings = QrSettings::default();
        let payload = "BEGIN:VCARD";
        let img = render(payload, &settings).unwrap();
        let code = QrCode::with_version(payload, Version::Normal(5), EcLevel::H).unwrap();
        let width = code.width();

        for y in 0..width {
            for x in 0..width {
                let cx = (x as u32 + BORDER) * BOX_SIZE + BOX_SIZE / 2;
                let cy = (y as u32 + BORDER) * BOX_SIZE + BOX_SIZE / 2;
                let expected = if code[(x, y)] == Color::Dark { DARK } else { LIGHT };
                assert_eq!(*img.get_pixel(cx, cy), expected, "module ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_gapped_data_modules_and_solid_finders() {
        let settings = QrSettings::default();
        let payload = "gapped";
        let img = render(payload, &settings).unwrap();
        let code = QrCode::with_version(payload, Version::Normal(5), EcLevel::H).unwrap();
        let width = code.width() as u32;

        // Finder pattern corner module is solid up to its edge
        let origin = BORDER * BOX_SIZE;
        assert_eq!(*img.get_pixel(origin, origin), DARK);

        // Timing pattern row 6 has dark data-style modules at even columns
        let x = 8u32;
        assert!(!is_finder_module(x, 6, width));
        assert_eq!(code[(x as usize, 6)], Color::Dark);
        let px = (x + BORDER) * BOX_SIZE;
        let py = (6 + BORDER) * BOX_SIZE;
        assert_eq!(*img.get_pixel(px, py), LIGHT);
        assert_eq!(*img.get_pixel(px + 1, py + 1), DARK);
        assert_eq!(*img.get_pixel(px + BOX_SIZE - 1, py + BOX_SIZE - 1), LIGHT);
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let img = render("quiet", &QrSettings::default()).unwrap();
        for i in 0..BORDER * BOX_SIZE {
            assert_eq!(*img.get_pixel(i, i), LIGHT);
        }
    }

    #[test]
    fn test_parse_error_correction() {
        assert_eq!("high".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
        assert_eq!("H".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::High);
        assert_eq!("m".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::Medium);
        assert!("ultra".parse::<ErrorCorrection>().is_err());
    }
}
