use anyhow::Result;
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

use super::face_detection::{FaceDetector, FaceRegion};
use super::resize::{crop_image, resize_image, ResizeFilter};

/// Output geometry of the profile crop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSettings {
    pub width: u32,
    pub height: u32,
    /// Extra margin around the face, as a share of the face's longer side (plus 0.25)
    pub zoom_out: f32,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            width: 80,
            height: 80,
            zoom_out: 0.5,
        }
    }
}

/// Source rectangle selected for the crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Circular profile picture ready for the card
#[derive(Debug, Clone)]
pub struct FaceCrop {
    pub image: RgbaImage,
    pub region: CropRegion,
    pub face_found: bool,
}

/// Crop a photo around the first detected face, or its centered square when
/// no face is found, then resize and cut it into a circle
pub fn crop_to_face(
    img: &RgbaImage,
    detector: &dyn FaceDetector,
    settings: &CropSettings,
) -> Result<FaceCrop> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow::anyhow!("Cannot crop an empty image"));
    }

    let gray = imageops::grayscale(img);
    let face = detector.first_face(&gray)?;

    let (region, face_found) = match face.and_then(|f| face_region(f, settings.zoom_out, width, height)) {
        Some(region) => (region, true),
        None => (center_square_region(width, height), false),
    };

    let cropped = crop_image(img, region.x, region.y, region.width, region.height)?;
    let resized = resize_image(
        &drop_alpha(&cropped),
        settings.width,
        settings.height,
        ResizeFilter::AreaAverage,
    )?;

    let mask = circular_mask(settings.width, settings.height);

    Ok(FaceCrop {
        image: apply_mask(&resized, &mask),
        region,
        face_found,
    })
}

/// Expand a detected face by its padding, clamped to the image
///
/// Returns `None` if nothing of the expanded box lies inside the image.
pub fn face_region(face: FaceRegion, zoom_out: f32, img_width: u32, img_height: u32) -> Option<CropRegion> {
    let padding = ((zoom_out + 0.25) * face.width.max(face.height) as f32).floor() as i64;

    let x = (face.x as i64 - padding).max(0);
    let y = (face.y as i64 - padding).max(0);
    let width = (face.width as i64 + 2 * padding).min(img_width as i64 - x);
    let height = (face.height as i64 + 2 * padding).min(img_height as i64 - y);

    if width <= 0 || height <= 0 {
        return None;
    }

    Some(CropRegion {
        x: x as u32,
        y: y as u32,
        width: width as u32,
        height: height as u32,
    })
}

/// Largest square centered on the image midpoint
pub fn center_square_region(width: u32, height: u32) -> CropRegion {
    let side = width.min(height);
    CropRegion {
        x: (width - side) / 2,
        y: (height - side) / 2,
        width: side,
        height: side,
    }
}

/// Binary mask of the circle inscribed in a `width`x`height` square
///
/// Radius is half the width. Same size in, same mask out.
pub fn circular_mask(width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let center = ((width / 2) as i32, (height / 2) as i32);
    draw_filled_circle_mut(&mut mask, center, (width / 2) as i32, Luma([255u8]));
    mask
}

/// Make every pixel opaque while keeping its color
fn drop_alpha(img: &RgbaImage) -> RgbaImage {
    let mut opaque = img.clone();
    for pixel in opaque.pixels_mut() {
        pixel[3] = 255;
    }
    opaque
}

/// Use `mask` as the alpha channel: outside pixels become fully transparent
/// black, inside pixels keep their color at full opacity
pub fn apply_mask(img: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(img.width(), img.height(), |x, y| {
        let inside = mask
            .get_pixel_checked(x, y)
            .map(|m| m[0] > 0)
            .unwrap_or(false);

        if inside {
            let p = img.get_pixel(x, y);
            Rgba([p[0], p[1], p[2], 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::face_detection::NoFaceDetector;

    struct FixedDetector(Vec<FaceRegion>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _gray: &GrayImage) -> Result<Vec<FaceRegion>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x * 3 + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_center_square_region() {
        assert_eq!(
            center_square_region(120, 90),
            CropRegion { x: 15, y: 0, width: 90, height: 90 }
        );
        assert_eq!(
            center_square_region(60, 100),
            CropRegion { x: 0, y: 20, width: 60, height: 60 }
        );
    }

    #[test]
    fn test_face_region_padding_and_clamping() {
        // padding = floor(0.75 * 100) = 75
        let face = FaceRegion { x: 200, y: 150, width: 100, height: 80 };
        assert_eq!(
            face_region(face, 0.5, 1000, 1000),
            Some(CropRegion { x: 125, y: 75, width: 250, height: 230 })
        );

        // Near the top-left corner the origin clamps to zero
        let face = FaceRegion { x: 20, y: 10, width: 100, height: 100 };
        assert_eq!(
            face_region(face, 0.5, 1000, 1000),
            Some(CropRegion { x: 0, y: 0, width: 250, height: 250 })
        );

        // Near the bottom-right corner the extent clamps to the image
        let face = FaceRegion { x: 400, y: 300, width: 80, height: 80 };
        assert_eq!(
            face_region(face, 0.5, 480, 360),
            Some(CropRegion { x: 340, y: 240, width: 140, height: 120 })
        );
    }

    #[test]
    fn test_face_region_outside_image() {
        let face = FaceRegion { x: 900, y: 900, width: 50, height: 50 };
        assert_eq!(face_region(face, 0.0, 100, 100), None);
    }

    #[test]
    fn test_crop_without_face_is_deterministic() {
        let img = gradient(120, 90);
        let settings = CropSettings::default();

        let first = crop_to_face(&img, &NoFaceDetector, &settings).unwrap();
        let second = crop_to_face(&img, &NoFaceDetector, &settings).unwrap();

        assert!(!first.face_found);
        assert_eq!(first.region, CropRegion { x: 15, y: 0, width: 90, height: 90 });
        assert_eq!(first.image.dimensions(), (80, 80));
        assert_eq!(first.image.as_raw(), second.image.as_raw());
    }

    #[test]
    fn test_crop_uses_first_face() {
        let img = gradient(400, 400);
        let detector = FixedDetector(vec![
            FaceRegion { x: 150, y: 150, width: 60, height: 60 },
            FaceRegion { x: 0, y: 0, width: 300, height: 300 },
        ]);

        let crop = crop_to_face(&img, &detector, &CropSettings::default()).unwrap();

        // padding = floor(0.75 * 60) = 45
        assert!(crop.face_found);
        assert_eq!(crop.region, CropRegion { x: 105, y: 105, width: 150, height: 150 });
    }

    #[test]
    fn test_mask_corners_transparent_center_opaque() {
        let img = gradient(200, 200);
        let crop = crop_to_face(&img, &NoFaceDetector, &CropSettings::default()).unwrap();

        assert_eq!(*crop.image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*crop.image.get_pixel(79, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*crop.image.get_pixel(0, 79), Rgba([0, 0, 0, 0]));
        assert_eq!(*crop.image.get_pixel(79, 79), Rgba([0, 0, 0, 0]));
        assert_eq!(crop.image.get_pixel(40, 40)[3], 255);
    }

    #[test]
    fn test_circular_mask_is_pure_function_of_size() {
        assert_eq!(circular_mask(80, 80), circular_mask(80, 80));
        assert_ne!(circular_mask(80, 80).as_raw(), circular_mask(60, 60).as_raw());
    }

    #[test]
    fn test_applying_mask_twice_keeps_transparency_pattern() {
        let img = gradient(80, 80);
        let mask = circular_mask(80, 80);

        let once = apply_mask(&img, &mask);
        let twice = apply_mask(&once, &mask);

        let alpha = |i: &RgbaImage| i.pixels().map(|p| p[3]).collect::<Vec<u8>>();
        assert_eq!(alpha(&once), alpha(&twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_transparent_source_becomes_opaque_inside_circle() {
        let img = RgbaImage::from_pixel(100, 100, Rgba([10, 20, 30, 0]));
        let crop = crop_to_face(&img, &NoFaceDetector, &CropSettings::default()).unwrap();
        assert_eq!(*crop.image.get_pixel(40, 40), Rgba([10, 20, 30, 255]));
    }
}
