//! Image validation, normalization and encoding.
//!
//! Uploads arrive as arbitrary byte buffers. The working raster format is
//! RGBA8; output is always PNG. Every operation here returns a fresh buffer
//! — nothing aliases the caller's input.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

/// Working-buffer bound: neither dimension of a normalized image exceeds this.
pub const MAX_WORKING_DIM: u32 = 800;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("no image payload supplied")]
    Empty,
    #[error("image bytes could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image could not be encoded: {0}")]
    Encode(#[source] image::ImageError),
}

/// Report whether `bytes` decodes to a raster image with positive
/// dimensions. Never errors — malformed input is simply `false`.
///
/// This is the cheap pre-flight check; [`decode_rgba`] is the loud variant
/// used by the mutating path.
pub fn validate(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let reader = match ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(r) => r,
        Err(_) => return false,
    };
    match reader.into_dimensions() {
        Ok((w, h)) => w > 0 && h > 0,
        Err(_) => false,
    }
}

/// Decode an uploaded buffer into the RGBA8 working format.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, RasterError> {
    if bytes.is_empty() {
        return Err(RasterError::Empty);
    }
    let img = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
    Ok(img.to_rgba8())
}

/// Decode and scale down so neither dimension exceeds `max_w`/`max_h`,
/// preserving aspect ratio. Images already within bounds pass through at
/// their original size — this never upscales.
pub fn resize_to_working(bytes: &[u8], max_w: u32, max_h: u32) -> Result<RgbaImage, RasterError> {
    if bytes.is_empty() {
        return Err(RasterError::Empty);
    }
    let img = image::load_from_memory(bytes).map_err(RasterError::Decode)?;
    let (w, h) = (img.width(), img.height());

    if w <= max_w && h <= max_h {
        return Ok(img.to_rgba8());
    }

    let resized = img.thumbnail(max_w, max_h);
    tracing::debug!(
        from_width = w,
        from_height = h,
        to_width = resized.width(),
        to_height = resized.height(),
        "downscaled working buffer"
    );
    Ok(resized.to_rgba8())
}

/// Encode the working buffer as PNG (lossless, same format for input and
/// output of every strategy).
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, RasterError> {
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .map_err(RasterError::Encode)?;
    Ok(out)
}

/// Wrap PNG bytes in a `data:image/png;base64,` URI for the storefront.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}
