//! Cover art normalisation before embedding
//!
//! Covers are stored as baseline JPEG no larger than `MAX_COVER_SIZE` on
//! either side, which every player that reads ID3 pictures can display.

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Maximum width or height of an embedded cover
const MAX_COVER_SIZE: u32 = 640;

/// JPEG quality used when a cover has to be re-encoded
const JPEG_QUALITY: u8 = 85;

/// Normalise fetched cover bytes to a JPEG that fits within `MAX_COVER_SIZE`
///
/// JPEGs that already fit are returned untouched.
pub fn normalize_cover(data: &[u8]) -> Result<Vec<u8>> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to guess cover art format")?;
    let format = reader.format();

    let img = reader.decode().context("Failed to decode cover art")?;
    let (width, height) = (img.width(), img.height());

    if format == Some(ImageFormat::Jpeg) && width <= MAX_COVER_SIZE && height <= MAX_COVER_SIZE {
        return Ok(data.to_vec());
    }

    let img = if width > MAX_COVER_SIZE || height > MAX_COVER_SIZE {
        debug!("Downscaling cover art from {}x{}", width, height);
        // resize() keeps the aspect ratio within the bounding box
        img.resize(MAX_COVER_SIZE, MAX_COVER_SIZE, FilterType::Lanczos3)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Vec::new();
    JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
        .encode_image(&rgb)
        .context("Failed to encode cover art as JPEG")?;

    debug!(
        "Normalised cover art: {}x{} -> {} bytes",
        rgb.width(),
        rgb.height(),
        output.len()
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn decode(data: &[u8]) -> DynamicImage {
        image::load_from_memory(data).unwrap()
    }

    #[test]
    fn test_small_jpeg_passes_through() {
        let jpeg = encode(&DynamicImage::new_rgb8(100, 100), ImageFormat::Jpeg);
        assert_eq!(normalize_cover(&jpeg).unwrap(), jpeg);
    }

    #[test]
    fn test_large_cover_is_downscaled() {
        let png = encode(&DynamicImage::new_rgb8(1500, 1000), ImageFormat::Png);
        let out = decode(&normalize_cover(&png).unwrap());
        assert_eq!(out.width(), MAX_COVER_SIZE);
        assert!(out.height() < MAX_COVER_SIZE);
    }

    #[test]
    fn test_png_with_alpha_becomes_jpeg() {
        let png = encode(&DynamicImage::new_rgba8(64, 64), ImageFormat::Png);
        let out = normalize_cover(&png).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(normalize_cover(b"definitely not an image").is_err());
    }
}
