//! Cover art normalization before embedding
//!
//! Catalog sites serve covers in whatever format and size the CDN has on
//! hand. Every container branch of the tagging engine embeds a baseline
//! JPEG front cover, so the raw bytes are decoded, downscaled if oversized,
//! and re-encoded here first.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Maximum dimension (width or height) for embedded covers
const MAX_COVER_SIZE: u32 = 1200;

/// JPEG quality (0-100)
const JPEG_QUALITY: u8 = 85;

/// A cover image re-encoded as baseline JPEG, with its final dimensions
#[derive(Debug, Clone)]
pub struct ProcessedCover {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode raw cover bytes, downscale to fit [`MAX_COVER_SIZE`], and
/// re-encode as baseline JPEG
pub fn process_cover_art(data: &[u8]) -> Result<ProcessedCover> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess cover art format")?
        .decode()
        .context("Failed to decode cover art")?;

    let img = resize_to_fit(img);
    let (width, height) = (img.width(), img.height());

    let mut output = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY);
    encoder
        .encode_image(&img)
        .context("Failed to encode cover art as JPEG")?;

    debug!(
        "Processed cover art: {}x{} -> {} bytes",
        width,
        height,
        output.len()
    );

    Ok(ProcessedCover {
        data: output,
        width,
        height,
    })
}

/// Resize image to fit within [`MAX_COVER_SIZE`] while keeping aspect ratio
fn resize_to_fit(img: DynamicImage) -> DynamicImage {
    let (width, height) = (img.width(), img.height());

    if width <= MAX_COVER_SIZE && height <= MAX_COVER_SIZE {
        return img;
    }

    let (new_width, new_height) = if width > height {
        let ratio = MAX_COVER_SIZE as f64 / width as f64;
        (MAX_COVER_SIZE, (height as f64 * ratio) as u32)
    } else {
        let ratio = MAX_COVER_SIZE as f64 / height as f64;
        ((width as f64 * ratio) as u32, MAX_COVER_SIZE)
    };

    debug!(
        "Resizing cover art: {}x{} -> {}x{}",
        width, height, new_width, new_height
    );

    img.resize(new_width, new_height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_image_not_resized() {
        let img = DynamicImage::new_rgb8(500, 500);
        let resized = resize_to_fit(img);
        assert_eq!(resized.width(), 500);
        assert_eq!(resized.height(), 500);
    }

    #[test]
    fn test_large_image_resized() {
        let img = DynamicImage::new_rgb8(3000, 2000);
        let resized = resize_to_fit(img);
        assert_eq!(resized.width(), MAX_COVER_SIZE);
        assert!(resized.height() <= MAX_COVER_SIZE);
    }

    #[test]
    fn test_process_produces_jpeg() {
        let img = DynamicImage::new_rgb8(64, 64);
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let cover = process_cover_art(&png).unwrap();
        assert_eq!(cover.width, 64);
        assert_eq!(cover.height, 64);
        // JPEG SOI marker
        assert_eq!(&cover.data[..2], &[0xFF, 0xD8]);
    }
}
