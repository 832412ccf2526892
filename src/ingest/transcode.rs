use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

use crate::config::ImageConfig;

/// Mime type of every transcoded artifact.
pub const WEBP_MIME: &str = "image/webp";

/// Output of a successful transcode.
#[derive(Debug, Clone)]
pub struct TranscodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Resample `bytes` to the configured bounding width (never upscaling) and
/// re-encode as lossy WebP. Any decode or encode problem fails the whole
/// transcode; no partial artifact is produced.
pub fn transcode(bytes: &[u8], config: &ImageConfig) -> Result<TranscodedImage, String> {
    let image = load_image(bytes)?;
    let resized = bound_width(image, config.max_width)?;
    encode_webp(&resized, config.quality)
}

fn load_image(bytes: &[u8]) -> Result<DynamicImage, String> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| format!("Failed to detect image format: {}", e))?;

    reader
        .decode()
        .map_err(|e| format!("Failed to decode image: {}", e))
}

/// Scale down to `max_width` preserving aspect ratio; images already within
/// the bound pass through untouched.
fn bound_width(image: DynamicImage, max_width: u32) -> Result<DynamicImage, String> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err("Invalid image dimensions".to_string());
    }
    if width <= max_width {
        return Ok(image);
    }

    let new_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
    Ok(image.resize(max_width, new_height, image::imageops::FilterType::Lanczos3))
}

fn encode_webp(image: &DynamicImage, quality: f32) -> Result<TranscodedImage, String> {
    let (width, height) = image.dimensions();

    // The webp encoder only accepts 8-bit RGB/RGBA layouts.
    let normalized = if image.color().has_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let encoder = webp::Encoder::from_image(&normalized)
        .map_err(|e| format!("Failed to prepare WebP encoder: {}", e))?;
    let encoded = encoder.encode(quality);

    Ok(TranscodedImage {
        bytes: encoded.to_vec(),
        width,
        height,
    })
}
