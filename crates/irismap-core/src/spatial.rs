//! Neighborhood-dependent filters: Gaussian blur and sharpening.
//!
//! Both filters write to an independent output buffer, never reading a
//! buffer that is being written in the same pass. Pixels without a full
//! neighborhood use clamp-to-edge sampling so edges stay visually
//! continuous.

use crate::PixelBuffer;

/// Apply a Gaussian blur with the given pixel radius.
///
/// A radius of zero (or an empty buffer) is a no-op copy, and the image
/// is never resampled. The blur is separable: one horizontal and one
/// vertical pass with a kernel derived from `sigma = radius / 2`.
pub fn gaussian_blur(source: &PixelBuffer, radius: f32) -> PixelBuffer {
    if radius <= 0.0 || source.is_empty() {
        return source.clone();
    }

    let sigma = radius * 0.5;
    let kernel = gaussian_kernel(sigma);

    let horizontal = blur_pass(source, &kernel, true);
    blur_pass(&horizontal, &kernel, false)
}

/// Build a normalized 1D Gaussian kernel for the given sigma.
///
/// The kernel covers three standard deviations to either side.
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let half = ((sigma * 3.0).ceil() as i64).max(1);
    let denom = 2.0 * sigma * sigma;

    let mut weights = Vec::with_capacity((2 * half + 1) as usize);
    let mut sum = 0.0f32;
    for i in -half..=half {
        let x = i as f32;
        let w = (-(x * x) / denom).exp();
        weights.push(w);
        sum += w;
    }
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// One separable blur pass over all four channels.
fn blur_pass(source: &PixelBuffer, kernel: &[f32], horizontal: bool) -> PixelBuffer {
    let w = source.width as i64;
    let h = source.height as i64;
    let half = (kernel.len() / 2) as i64;

    let mut out = vec![0u8; source.samples.len()];

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (ki, weight) in kernel.iter().enumerate() {
                let offset = ki as i64 - half;
                // Clamp-to-edge sampling
                let (sx, sy) = if horizontal {
                    ((x + offset).clamp(0, w - 1), y)
                } else {
                    (x, (y + offset).clamp(0, h - 1))
                };
                let idx = ((sy * w + sx) * 4) as usize;
                for c in 0..4 {
                    acc[c] += source.samples[idx + c] as f32 * weight;
                }
            }
            let idx = ((y * w + x) * 4) as usize;
            for c in 0..4 {
                out[idx + c] = acc[c].clamp(0.0, 255.0).round() as u8;
            }
        }
    }

    PixelBuffer::new(source.width, source.height, out)
}

/// Apply the sharpening convolution.
///
/// Sharpness ranges from -100 to 100; `k = sharpness / 100` drives the
/// 3x3 kernel `[[0,-k,0],[-k,4k+1,-k],[0,-k,0]]`, so k = 0 is the
/// identity and negative values soften. Output is an independent
/// buffer; border pixels sample clamp-to-edge.
pub fn sharpen(source: &PixelBuffer, sharpness: f32) -> PixelBuffer {
    let k = sharpness.clamp(-100.0, 100.0) / 100.0;
    if k == 0.0 || source.is_empty() {
        return source.clone();
    }

    let w = source.width as i64;
    let h = source.height as i64;
    let center = 4.0 * k + 1.0;

    let mut out = vec![0u8; source.samples.len()];

    let sample = |x: i64, y: i64, c: usize| -> f32 {
        let sx = x.clamp(0, w - 1);
        let sy = y.clamp(0, h - 1);
        source.samples[((sy * w + sx) * 4) as usize + c] as f32
    };

    for y in 0..h {
        for x in 0..w {
            let idx = ((y * w + x) * 4) as usize;
            for c in 0..3 {
                let cross = sample(x, y - 1, c)
                    + sample(x, y + 1, c)
                    + sample(x - 1, y, c)
                    + sample(x + 1, y, c);
                let v = sample(x, y, c) * center - k * cross;
                out[idx + c] = v.clamp(0.0, 255.0).round() as u8;
            }
            // Alpha passes through
            out[idx + 3] = source.samples[idx + 3];
        }
    }

    PixelBuffer::new(source.width, source.height, out)
}
