//! PNG encoding for export.
//!
//! Exports are always PNG so the grid overlay's thin strokes survive
//! without compression artifacts.

use image::codecs::png::PngEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;
use thiserror::Error;

use crate::PixelBuffer;

/// Errors that can occur during PNG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    EncodingFailed(#[from] image::ImageError),
}

/// Encode an RGBA8 buffer to PNG bytes.
///
/// # Returns
///
/// PNG-encoded bytes on success, or an error for zero-sized buffers or
/// encoder failures.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
    if buffer.width == 0 || buffer.height == 0 {
        return Err(EncodeError::InvalidDimensions {
            width: buffer.width,
            height: buffer.height,
        });
    }

    let mut out = Cursor::new(Vec::new());
    PngEncoder::new(&mut out).write_image(
        &buffer.samples,
        buffer.width,
        buffer.height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(out.into_inner())
}

/// Export file name for a capture taken at `timestamp_ms` (Unix epoch
/// milliseconds).
pub fn export_file_name(timestamp_ms: u64) -> String {
    format!("iris_map_{}.png", timestamp_ms)
}
