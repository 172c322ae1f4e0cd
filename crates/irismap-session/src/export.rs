//! Flattening sessions into exported PNG files.
//!
//! Export bakes everything the viewport shows into pixels: the
//! adjusted photograph resampled through the display transform
//! (inverse mapping with bilinear filtering), then the grid raster
//! blended on top at the overlay opacity. The dual view exports both
//! eyes side by side. Nothing here mutates session state, so a failed
//! export leaves the editing session exactly as it was.

use irismap_core::encode::{encode_png, export_file_name, EncodeError};
use irismap_core::overlay::OverlayError;
use irismap_core::transform::Affine;
use irismap_core::{apply_adjustments, PixelBuffer};
use thiserror::Error;
use tracing::info;

use crate::session::{Eye, EyeSession, Mapper};

/// Errors from export. Always recoverable; session state is unaffected.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An exported eye has no photograph loaded
    #[error("No image loaded to export")]
    NoImage,

    /// The display transform cannot be inverted
    #[error("Display transform is degenerate")]
    DegenerateTransform,

    /// The grid could not be rasterized
    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    /// The grid markup could not be recolored
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    /// PNG encoding failed
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failure reported by a [`GridRasterizer`] implementation.
#[derive(Debug, Error)]
#[error("Grid rasterization failed: {0}")]
pub struct RasterizeError(pub String);

/// Renders recolored grid markup to an RGBA raster of the requested
/// size. Implementations live with whatever vector backend the host
/// embeds.
pub trait GridRasterizer {
    fn rasterize(&self, svg: &str, width: u32, height: u32)
        -> Result<PixelBuffer, RasterizeError>;
}

/// A finished export ready to hand to the host for saving.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// `iris_map_{timestamp_ms}.png`
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// PNG-encoded image data.
    pub bytes: Vec<u8>,
}

/// Resample `source` into a `width` x `height` canvas through the
/// image-to-display matrix, bilinear, transparent outside the image.
pub fn resample_through(
    source: &PixelBuffer,
    matrix: &Affine,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, ExportError> {
    let inverse = matrix.invert().ok_or(ExportError::DegenerateTransform)?;

    let mut samples = vec![0u8; (width as usize) * (height as usize) * 4];
    for y in 0..height {
        for x in 0..width {
            // Pixel centers map through the inverse into texel space.
            let (sx, sy) = inverse.apply(x as f32 + 0.5, y as f32 + 0.5);
            if let Some(rgba) = sample_bilinear(source, sx - 0.5, sy - 0.5) {
                let offset = ((y as usize) * (width as usize) + (x as usize)) * 4;
                for channel in 0..4 {
                    samples[offset + channel] =
                        (rgba[channel].clamp(0.0, 255.0)).round() as u8;
                }
            }
        }
    }
    Ok(PixelBuffer::new(width, height, samples))
}

/// Bilinear sample at texel coordinates, or `None` outside the image.
fn sample_bilinear(buffer: &PixelBuffer, x: f32, y: f32) -> Option<[f32; 4]> {
    let max_x = (buffer.width as f32) - 1.0;
    let max_y = (buffer.height as f32) - 1.0;
    if x < 0.0 || y < 0.0 || x > max_x || y > max_y {
        return None;
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(buffer.width - 1);
    let y1 = (y0 + 1).min(buffer.height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = buffer.pixel(x0, y0);
    let p10 = buffer.pixel(x1, y0);
    let p01 = buffer.pixel(x0, y1);
    let p11 = buffer.pixel(x1, y1);

    let mut out = [0.0f32; 4];
    for channel in 0..4 {
        let top = p00[channel] as f32 * (1.0 - fx) + p10[channel] as f32 * fx;
        let bottom = p01[channel] as f32 * (1.0 - fx) + p11[channel] as f32 * fx;
        out[channel] = top * (1.0 - fy) + bottom * fy;
    }
    Some(out)
}

/// Source-over blend of a straight-alpha overlay, scaled by `opacity`.
pub fn blend_overlay(base: &mut PixelBuffer, overlay: &PixelBuffer, opacity: f32) {
    debug_assert_eq!(base.width, overlay.width);
    debug_assert_eq!(base.height, overlay.height);
    let opacity = opacity.clamp(0.0, 1.0);

    for (dst, src) in base
        .samples
        .chunks_exact_mut(4)
        .zip(overlay.samples.chunks_exact(4))
    {
        let sa = (src[3] as f32 / 255.0) * opacity;
        if sa <= 0.0 {
            continue;
        }
        let da = dst[3] as f32 / 255.0;
        let ra = sa + da * (1.0 - sa);
        if ra <= 0.0 {
            continue;
        }
        for channel in 0..3 {
            let sc = src[channel] as f32;
            let dc = dst[channel] as f32;
            let rc = (sc * sa + dc * da * (1.0 - sa)) / ra;
            dst[channel] = rc.clamp(0.0, 255.0).round() as u8;
        }
        dst[3] = (ra * 255.0).clamp(0.0, 255.0).round() as u8;
    }
}

/// Place two equal-height buffers side by side, left first.
pub fn side_by_side(left: &PixelBuffer, right: &PixelBuffer) -> PixelBuffer {
    debug_assert_eq!(left.height, right.height);
    let width = left.width + right.width;
    let mut samples = Vec::with_capacity((width as usize) * (left.height as usize) * 4);
    for y in 0..left.height {
        let row = |buffer: &PixelBuffer| {
            let start = (y as usize) * (buffer.width as usize) * 4;
            start..start + (buffer.width as usize) * 4
        };
        samples.extend_from_slice(&left.samples[row(left)]);
        samples.extend_from_slice(&right.samples[row(right)]);
    }
    PixelBuffer::new(width, left.height, samples)
}

/// Flatten one eye: adjust, resample through the display transform,
/// and blend the grid raster on top.
pub fn flatten_eye(
    session: &EyeSession,
    viewport_width: u32,
    viewport_height: u32,
    rasterizer: &dyn GridRasterizer,
) -> Result<PixelBuffer, ExportError> {
    let source = session.source().ok_or(ExportError::NoImage)?;
    let adjusted = apply_adjustments(source, &session.adjustments);

    let matrix = session.transform.matrix(
        viewport_width as f32,
        viewport_height as f32,
        adjusted.width,
        adjusted.height,
    );
    let mut flat = resample_through(&adjusted, &matrix, viewport_width, viewport_height)?;

    if let Some(svg) = session.overlay.display_content()? {
        let raster = rasterizer.rasterize(&svg, viewport_width, viewport_height)?;
        blend_overlay(&mut flat, &raster, session.overlay.opacity());
    }
    Ok(flat)
}

/// Export what the mapper currently shows as a timestamped PNG.
///
/// The single view exports the active eye at the viewport size; the
/// dual view exports left and right side by side, doubling the width.
pub fn export_png(
    mapper: &Mapper,
    viewport_width: u32,
    viewport_height: u32,
    rasterizer: &dyn GridRasterizer,
    timestamp_ms: u64,
) -> Result<ExportOutput, ExportError> {
    let flat = if mapper.is_dual() {
        let left = flatten_eye(
            mapper.session(Eye::Left),
            viewport_width,
            viewport_height,
            rasterizer,
        )?;
        let right = flatten_eye(
            mapper.session(Eye::Right),
            viewport_width,
            viewport_height,
            rasterizer,
        )?;
        side_by_side(&left, &right)
    } else {
        flatten_eye(
            mapper.active_session(),
            viewport_width,
            viewport_height,
            rasterizer,
        )?
    };

    let bytes = encode_png(&flat)?;
    let file_name = export_file_name(timestamp_ms);
    info!(
        file = %file_name,
        width = flat.width,
        height = flat.height,
        "Export complete"
    );
    Ok(ExportOutput {
        file_name,
        width: flat.width,
        height: flat.height,
        bytes,
    })
}
