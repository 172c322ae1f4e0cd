//! Image decoding for photograph loading.
//!
//! Photographs arrive either as raw file bytes (the file picker path)
//! or as base64 data URLs (the gallery path). Both decode into an RGBA8
//! [`PixelBuffer`] through the `image` crate.

use base64::Engine;
use thiserror::Error;

use crate::PixelBuffer;

/// Errors that can occur while decoding a photograph.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input was empty
    #[error("Empty input: no image data provided")]
    EmptyInput,

    /// The `image` crate could not decode the bytes
    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// A data URL without the expected `data:...;base64,` shape
    #[error("Malformed data URL")]
    MalformedDataUrl,

    /// The base64 payload of a data URL could not be decoded
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Decode encoded image bytes (PNG or JPEG) into an RGBA8 buffer.
///
/// # Arguments
///
/// * `bytes` - The raw contents of an image file
///
/// # Returns
///
/// A [`PixelBuffer`] with straight-alpha RGBA8 samples, or a
/// [`DecodeError`] if the bytes are empty or unrecognized.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::EmptyInput);
    }
    let decoded = image::load_from_memory(bytes)?;
    Ok(PixelBuffer::from_rgba_image(decoded.to_rgba8()))
}

/// Decode a `data:<mime>;base64,<payload>` URL into an RGBA8 buffer.
///
/// This is the path gallery images take; the media type prefix is
/// ignored since the decoder sniffs the actual format from the payload.
pub fn decode_data_url(url: &str) -> Result<PixelBuffer, DecodeError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or(DecodeError::MalformedDataUrl)?;
    let (_media_type, payload) = rest
        .split_once(";base64,")
        .ok_or(DecodeError::MalformedDataUrl)?;

    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    decode_image(&bytes)
}
