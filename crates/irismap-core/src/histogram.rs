//! Histogram computation from RGBA pixel data.
//!
//! The histogram always runs on a buffer as actually rendered (post
//! pipeline), so the plotted distribution matches what the user sees.

use crate::{Histogram, PixelBuffer};

/// Compute per-channel histograms from a rendered buffer.
///
/// # Returns
/// A `Histogram` with raw (unnormalized) red, green and blue counts.
///
/// # Performance
/// Single pass, O(width * height); constant memory for the bins.
pub fn compute_histogram(buffer: &PixelBuffer) -> Histogram {
    let mut hist = Histogram::new();

    if buffer.is_empty() {
        return hist;
    }

    debug_assert_eq!(
        buffer.samples.len(),
        (buffer.width as usize) * (buffer.height as usize) * 4,
        "Sample buffer size mismatch"
    );

    for chunk in buffer.samples.chunks_exact(4) {
        hist.red[chunk[0] as usize] += 1;
        hist.green[chunk[1] as usize] += 1;
        hist.blue[chunk[2] as usize] += 1;
    }

    hist
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer() {
        let buf = PixelBuffer::new(0, 0, vec![]);
        let hist = compute_histogram(&buf);
        assert!(hist.is_empty());
        assert_eq!(hist.max_value(), 0);
    }

    #[test]
    fn test_solid_gray_two_by_two() {
        let buf = PixelBuffer::solid(2, 2, [128, 128, 128, 255]);
        let hist = compute_histogram(&buf);

        assert_eq!(hist.red[128], 4);
        assert_eq!(hist.green[128], 4);
        assert_eq!(hist.blue[128], 4);
        for i in 0..256 {
            if i != 128 {
                assert_eq!(hist.red[i], 0, "Unexpected count in red bin {}", i);
            }
        }
    }

    #[test]
    fn test_primary_colors() {
        let mut samples = Vec::new();
        samples.extend_from_slice(&[255, 0, 0, 255]); // Red
        samples.extend_from_slice(&[0, 255, 0, 255]); // Green
        samples.extend_from_slice(&[0, 0, 255, 255]); // Blue
        let buf = PixelBuffer::new(3, 1, samples);

        let hist = compute_histogram(&buf);
        assert_eq!(hist.red[255], 1);
        assert_eq!(hist.red[0], 2);
        assert_eq!(hist.green[255], 1);
        assert_eq!(hist.green[0], 2);
        assert_eq!(hist.blue[255], 1);
        assert_eq!(hist.blue[0], 2);
    }

    #[test]
    fn test_alpha_is_not_binned() {
        let buf = PixelBuffer::solid(2, 1, [10, 20, 30, 200]);
        let hist = compute_histogram(&buf);
        assert_eq!(hist.red[200], 0);
        assert_eq!(hist.green[200], 0);
        assert_eq!(hist.blue[200], 0);
        assert_eq!(hist.red[10], 2);
    }

    #[test]
    fn test_gradient_fills_every_bin() {
        let mut samples = Vec::new();
        for i in 0..=255u8 {
            samples.extend_from_slice(&[i, i, i, 255]);
        }
        let buf = PixelBuffer::new(256, 1, samples);
        let hist = compute_histogram(&buf);

        for i in 0..256 {
            assert_eq!(hist.red[i], 1);
            assert_eq!(hist.green[i], 1);
            assert_eq!(hist.blue[i], 1);
        }
        assert_eq!(hist.max_value(), 1);
    }

    #[test]
    fn test_large_image_counts() {
        let buf = PixelBuffer::solid(100, 100, [64, 64, 64, 255]);
        let hist = compute_histogram(&buf);
        assert_eq!(hist.red[64], 10_000);
        assert_eq!(hist.total_count(), 10_000);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
