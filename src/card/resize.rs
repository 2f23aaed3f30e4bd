use anyhow::Result;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{ImageBuffer, RgbaImage};
use std::num::NonZeroU32;

/// Interpolation used when scaling card elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeFilter {
    /// Box convolution: every output pixel is the mean of the source area it covers
    AreaAverage,
    /// Lanczos3, used for logos and already cropped photos
    Lanczos,
}

impl ResizeFilter {
    fn algorithm(self) -> ResizeAlg {
        match self {
            ResizeFilter::AreaAverage => ResizeAlg::Convolution(FilterType::Box),
            ResizeFilter::Lanczos => ResizeAlg::Convolution(FilterType::Lanczos3),
        }
    }
}

/// Crop an image to the given rectangle
pub fn crop_image(img: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Result<RgbaImage> {
    let (img_width, img_height) = img.dimensions();

    if width == 0 || height == 0 || x + width > img_width || y + height > img_height {
        return Err(anyhow::anyhow!(
            "Crop dimensions exceed image bounds: crop({},{},{}x{}) on {}x{} image",
            x,
            y,
            width,
            height,
            img_width,
            img_height
        ));
    }

    Ok(image::imageops::crop_imm(img, x, y, width, height).to_image())
}

/// Resize an RGBA image to exact dimensions
pub fn resize_image(
    img: &RgbaImage,
    width: u32,
    height: u32,
    filter: ResizeFilter,
) -> Result<RgbaImage> {
    let (src_width, src_height) = img.dimensions();

    if src_width == width && src_height == height {
        return Ok(img.clone());
    }

    let src_width_nz = NonZeroU32::new(src_width).ok_or_else(|| anyhow::anyhow!("Source width is zero"))?;
    let src_height_nz = NonZeroU32::new(src_height).ok_or_else(|| anyhow::anyhow!("Source height is zero"))?;
    let dst_width_nz = NonZeroU32::new(width).ok_or_else(|| anyhow::anyhow!("Target width is zero"))?;
    let dst_height_nz = NonZeroU32::new(height).ok_or_else(|| anyhow::anyhow!("Target height is zero"))?;

    let src_image = Image::from_vec_u8(
        src_width_nz.get(),
        src_height_nz.get(),
        img.as_raw().clone(),
        PixelType::U8x4,
    )?;

    let mut dst_image = Image::new(dst_width_nz.get(), dst_height_nz.get(), PixelType::U8x4);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(filter.algorithm());
    resizer.resize(&src_image, &mut dst_image, &options)?;

    ImageBuffer::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| anyhow::anyhow!("Resized buffer does not match {}x{}", width, height))
}

/// Resize to a target width, keeping the aspect ratio
///
/// The height is truncated, never below one pixel.
pub fn resize_to_width(img: &RgbaImage, width: u32, filter: ResizeFilter) -> Result<RgbaImage> {
    let height = scaled_height(img.width(), img.height(), width);
    resize_image(img, width, height, filter)
}

/// Height matching `target_width` for a `width`x`height` source
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return target_width.max(1);
    }
    let aspect_ratio = width as f64 / height as f64;
    ((target_width as f64 / aspect_ratio) as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn create_test_image(width: u32, height: u32) -> RgbaImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn test_crop_image() {
        let img = create_test_image(100, 100);
        let cropped = crop_image(&img, 10, 10, 50, 50).unwrap();

        assert_eq!(cropped.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(15, 15), cropped.get_pixel(5, 5));
    }

    #[test]
    fn test_crop_bounds_validation() {
        let img = create_test_image(50, 50);

        assert!(crop_image(&img, 10, 10, 50, 50).is_err());
        assert!(crop_image(&img, 10, 10, 0, 10).is_err());
        assert!(crop_image(&img, 10, 10, 40, 40).is_ok());
    }

    #[test]
    fn test_resize_image() {
        let img = create_test_image(100, 100);
        let resized = resize_image(&img, 50, 50, ResizeFilter::AreaAverage).unwrap();
        assert_eq!(resized.dimensions(), (50, 50));
    }

    #[test]
    fn test_area_average_of_flat_image_is_flat() {
        let img = RgbaImage::from_pixel(160, 160, Rgba([40, 80, 120, 255]));
        let resized = resize_image(&img, 80, 80, ResizeFilter::AreaAverage).unwrap();
        assert!(resized.pixels().all(|p| *p == Rgba([40, 80, 120, 255])));
    }

    #[test]
    fn test_resize_to_width_keeps_aspect_ratio() {
        let img = create_test_image(200, 100);
        let resized = resize_to_width(&img, 70, ResizeFilter::Lanczos).unwrap();
        assert_eq!(resized.dimensions(), (70, 35));
    }

    #[test]
    fn test_scaled_height() {
        assert_eq!(scaled_height(300, 100, 70), 23);
        assert_eq!(scaled_height(80, 80, 80), 80);
        assert_eq!(scaled_height(1000, 1, 70), 1);
    }
}
