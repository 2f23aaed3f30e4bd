use anyhow::{Context, Result};
use image::{imageops, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_text_mut};
use std::path::Path;

use super::fonts::{em_scale, CardFonts};
use super::resize::{resize_to_width, ResizeFilter};

pub const CARD_WIDTH: u32 = 600;
pub const CARD_HEIGHT: u32 = 800;
pub const CORNER_RADIUS: u32 = 40;

const MARGIN: i64 = 30;
pub const LOGO_WIDTH: u32 = 70;
const PROFILE_WIDTH: u32 = 80;
const PROFILE_TOP: i64 = 100;
const QR_BOTTOM_OFFSET: i64 = 120;

const TITLE_Y: i32 = 120;
const NAME_Y: i32 = TITLE_Y + 20;
const EMAIL_LABEL_Y: i32 = TITLE_Y + 100;
const EMAIL_VALUE_Y: i32 = EMAIL_LABEL_Y + 20;
const PHONE_LABEL_Y: i32 = EMAIL_LABEL_Y + 60;
const PHONE_VALUE_Y: i32 = PHONE_LABEL_Y + 20;
const CREATED_BY_X: i32 = 450;

const LABEL_SIZE: f32 = 14.0;
const VALUE_SIZE: f32 = 22.0;
const TEXT_BOTTOM: i64 = PHONE_VALUE_Y as i64 + VALUE_SIZE as i64;

/// Text printed on a card
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardText<'a> {
    pub title: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    /// Digits only, the `+` is added when drawing
    pub phone: &'a str,
    pub created_by: &'a str,
}

/// Per-card colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardStyle {
    pub background: Rgba<u8>,
    pub text: Rgba<u8>,
}

/// Build a finished card
///
/// The logo is scaled to 70px wide, the profile picture to 80px wide; both are
/// alpha blended onto the background. The QR code is centered horizontally
/// 120px above the bottom edge.
pub fn compose(
    text: &CardText,
    style: &CardStyle,
    fonts: &CardFonts,
    logo: Option<&RgbaImage>,
    profile: Option<&RgbaImage>,
    qr: &RgbaImage,
) -> Result<RgbaImage> {
    let mut card = fill_background(style.background);

    if let Some(logo) = logo {
        place_logo(&mut card, logo)?;
    }

    draw_details(&mut card, text, style.text, fonts);
    place_qr(&mut card, qr);

    if let Some(profile) = profile {
        place_profile(&mut card, profile)?;
    }

    round_corners(&mut card, CORNER_RADIUS);
    Ok(card)
}

/// Write a card as PNG, replacing any existing file
pub fn save(card: &RgbaImage, path: &Path) -> Result<()> {
    card.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to save card: {}", path.display()))
}

pub fn fill_background(color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(CARD_WIDTH, CARD_HEIGHT, color)
}

pub fn place_logo(card: &mut RgbaImage, logo: &RgbaImage) -> Result<()> {
    let scaled = resize_to_width(logo, LOGO_WIDTH, ResizeFilter::Lanczos).context("Failed to scale logo")?;
    imageops::overlay(card, &scaled, MARGIN, MARGIN);
    Ok(())
}

pub fn place_profile(card: &mut RgbaImage, profile: &RgbaImage) -> Result<()> {
    let scaled =
        resize_to_width(profile, PROFILE_WIDTH, ResizeFilter::Lanczos).context("Failed to scale profile image")?;
    let x = card.width() as i64 - MARGIN - scaled.width() as i64;
    imageops::overlay(card, &scaled, x, PROFILE_TOP);
    Ok(())
}

/// Position of the QR code's top-left corner on a card of the given size
pub fn qr_position(card_width: u32, card_height: u32, qr_width: u32, qr_height: u32) -> (i64, i64) {
    let x = (card_width as i64 - qr_width as i64) / 2;
    let y = card_height as i64 - qr_height as i64 - QR_BOTTOM_OFFSET;
    (x, y)
}

/// True when a square QR code of `qr_size` pixels reaches up into the text block
pub fn qr_overlaps_text(qr_size: u32) -> bool {
    let (_, top) = qr_position(CARD_WIDTH, CARD_HEIGHT, qr_size, qr_size);
    top < TEXT_BOTTOM
}

pub fn place_qr(card: &mut RgbaImage, qr: &RgbaImage) {
    let (x, y) = qr_position(card.width(), card.height(), qr.width(), qr.height());
    imageops::overlay(card, qr, x, y);
}

pub fn draw_details(card: &mut RgbaImage, text: &CardText, color: Rgba<u8>, fonts: &CardFonts) {
    let left = MARGIN as i32;
    let bold = &fonts.bold;
    let regular = &fonts.regular;
    let phone = format!("+{}", text.phone);

    let lines: [(i32, i32, f32, &ab_glyph::FontArc, &str); 8] = [
        (left, TITLE_Y, LABEL_SIZE, bold, text.title),
        (left, NAME_Y, VALUE_SIZE, bold, text.name),
        (left, EMAIL_LABEL_Y, LABEL_SIZE, bold, "EMAIL"),
        (left, EMAIL_VALUE_Y, VALUE_SIZE, regular, text.email),
        (left, PHONE_LABEL_Y, LABEL_SIZE, bold, "MOBILE:"),
        (left, PHONE_VALUE_Y, VALUE_SIZE, regular, &phone),
        (CREATED_BY_X, EMAIL_LABEL_Y, LABEL_SIZE, bold, "CARD CREATED BY"),
        (CREATED_BY_X, EMAIL_VALUE_Y, VALUE_SIZE, regular, text.created_by),
    ];

    for (x, y, size, font, value) in lines {
        if value.is_empty() {
            continue;
        }
        draw_text_mut(card, color, x, y, em_scale(font, size), font, value);
    }
}

/// Alpha mask with quarter circles of `radius` cut from each corner
pub fn rounded_corner_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, Luma([255u8]));
    let radius = radius.min(width / 2).min(height / 2);
    if radius == 0 {
        return mask;
    }

    let diameter = radius * 2;
    let mut circle = GrayImage::new(diameter, diameter);
    draw_filled_circle_mut(&mut circle, (radius as i32, radius as i32), radius as i32, Luma([255u8]));

    // (corner origin on the card, quadrant origin in the circle)
    let corners = [
        ((0, 0), (0, 0)),
        ((width - radius, 0), (radius, 0)),
        ((0, height - radius), (0, radius)),
        ((width - radius, height - radius), (radius, radius)),
    ];

    for ((cx, cy), (qx, qy)) in corners {
        for dy in 0..radius {
            for dx in 0..radius {
                let value = *circle.get_pixel(qx + dx, qy + dy);
                mask.put_pixel(cx + dx, cy + dy, value);
            }
        }
    }

    mask
}

/// Cut the rounded corners into the card's alpha channel
pub fn round_corners(card: &mut RgbaImage, radius: u32) {
    let mask = rounded_corner_mask(card.width(), card.height(), radius);
    for (x, y, pixel) in card.enumerate_pixels_mut() {
        let alpha = mask.get_pixel(x, y)[0];
        if alpha < pixel[3] {
            pixel[3] = alpha;
        }
    }
}

/// Parse hex color string to RGBA
///
/// Supports formats: #RGB, #RRGGBB, #RRGGBBAA
pub fn parse_hex_color(color_str: &str) -> Result<Rgba<u8>> {
    let color_str = color_str.trim();
    let hex = color_str
        .strip_prefix('#')
        .ok_or_else(|| anyhow::anyhow!("Color must start with #: '{}'", color_str))?;

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(anyhow::anyhow!("Invalid hex digits in color: '{}'", color_str));
    }

    let channel = |s: &str| u8::from_str_radix(s, 16);

    match hex.len() {
        3 => {
            // #RGB -> #RRGGBB
            let r = channel(&hex[0..1].repeat(2))?;
            let g = channel(&hex[1..2].repeat(2))?;
            let b = channel(&hex[2..3].repeat(2))?;
            Ok(Rgba([r, g, b, 255]))
        }
        6 => Ok(Rgba([channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255])),
        8 => Ok(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ])),
        _ => Err(anyhow::anyhow!("Invalid hex color format: '{}'", color_str)),
    }
}
