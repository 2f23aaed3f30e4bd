use exif::{In, Reader, Tag, Value};
use image::{imageops, RgbaImage};
use std::io::Cursor;

/// EXIF orientation values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifOrientation {
    /// No orientation specified or undefined
    Undefined = 0,
    /// Normal orientation (0 degrees)
    TopLeft = 1,
    /// Horizontally flipped
    TopRight = 2,
    /// Rotated 180 degrees
    BottomRight = 3,
    /// Vertically flipped
    BottomLeft = 4,
    /// Rotated 90 degrees CCW + horizontally flipped
    LeftTop = 5,
    /// Rotated 90 degrees CW (portrait)
    RightTop = 6,
    /// Rotated 90 degrees CW + horizontally flipped
    RightBottom = 7,
    /// Rotated 90 degrees CCW (portrait)
    LeftBottom = 8,
}

impl From<u32> for ExifOrientation {
    fn from(value: u32) -> Self {
        match value {
            1 => ExifOrientation::TopLeft,
            2 => ExifOrientation::TopRight,
            3 => ExifOrientation::BottomRight,
            4 => ExifOrientation::BottomLeft,
            5 => ExifOrientation::LeftTop,
            6 => ExifOrientation::RightTop,
            7 => ExifOrientation::RightBottom,
            8 => ExifOrientation::LeftBottom,
            _ => ExifOrientation::Undefined,
        }
    }
}

/// Read the EXIF orientation tag from encoded image bytes
///
/// Formats without EXIF (or without the tag) report `Undefined`.
pub fn read_exif_orientation(bytes: &[u8]) -> ExifOrientation {
    let mut cursor = Cursor::new(bytes);
    let exif = match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return ExifOrientation::Undefined,
    };

    if let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) {
        if let Value::Short(values) = &field.value {
            if let Some(&orientation_value) = values.first() {
                return ExifOrientation::from(orientation_value as u32);
            }
        }
    }

    ExifOrientation::Undefined
}

/// Rotate/flip a decoded image so it displays upright
pub fn apply_rotation(img: RgbaImage, orientation: ExifOrientation) -> RgbaImage {
    match orientation {
        ExifOrientation::Undefined | ExifOrientation::TopLeft => img,
        ExifOrientation::TopRight => imageops::flip_horizontal(&img),
        ExifOrientation::BottomRight => imageops::rotate180(&img),
        ExifOrientation::BottomLeft => imageops::flip_vertical(&img),
        ExifOrientation::LeftTop => imageops::flip_horizontal(&imageops::rotate270(&img)),
        ExifOrientation::RightTop => imageops::rotate90(&img),
        ExifOrientation::RightBottom => imageops::flip_horizontal(&imageops::rotate90(&img)),
        ExifOrientation::LeftBottom => imageops::rotate270(&img),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_exif_orientation_from_u32() {
        assert_eq!(ExifOrientation::from(1), ExifOrientation::TopLeft);
        assert_eq!(ExifOrientation::from(6), ExifOrientation::RightTop);
        assert_eq!(ExifOrientation::from(8), ExifOrientation::LeftBottom);
        assert_eq!(ExifOrientation::from(99), ExifOrientation::Undefined);
    }

    #[test]
    fn test_bytes_without_exif_are_undefined() {
        assert_eq!(read_exif_orientation(b"not an image"), ExifOrientation::Undefined);
        assert_eq!(read_exif_orientation(&[]), ExifOrientation::Undefined);
    }

    #[test]
    fn test_apply_rotation_swaps_dimensions() {
        let img = RgbaImage::new(40, 20);
        assert_eq!(apply_rotation(img.clone(), ExifOrientation::RightTop).dimensions(), (20, 40));
        assert_eq!(apply_rotation(img.clone(), ExifOrientation::LeftBottom).dimensions(), (20, 40));
        assert_eq!(apply_rotation(img, ExifOrientation::BottomRight).dimensions(), (40, 20));
    }

    #[test]
    fn test_apply_rotation_moves_pixels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));

        let rotated = apply_rotation(img.clone(), ExifOrientation::RightTop);
        // 90 degrees clockwise: the left pixel ends up on top
        assert_eq!(*rotated.get_pixel(0, 0), Rgba([255, 0, 0, 255]));

        let flipped = apply_rotation(img, ExifOrientation::TopRight);
        assert_eq!(*flipped.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
    }
}
