//! Automatic exposure and contrast estimation from a histogram.
//!
//! The correction is a pure function of a histogram snapshot. Applying
//! it means *replacing* the exposure and contrast controls with the
//! suggested values, never adding to them, so repeated invocations
//! converge instead of oscillating.

use crate::Histogram;

/// Suggested control values produced by [`auto_levels`].
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelsCorrection {
    /// Replacement value for the exposure control (-50 to 50).
    pub exposure: f32,
    /// Replacement value for the contrast control (-50 to 50).
    pub contrast: f32,
}

impl LevelsCorrection {
    /// True when the correction would leave the controls untouched.
    pub fn is_zero(&self) -> bool {
        self.exposure == 0.0 && self.contrast == 0.0
    }
}

/// Fraction of pixels ignored at each end when locating black/white points.
const PERCENTILE_CLIP: f64 = 0.01;

/// Estimate exposure and contrast corrections from a histogram.
///
/// Black and white points are the 1st and 99th percentile sample values,
/// taken per channel and then widened to the extremes across channels.
/// Mean brightness is weighted toward green, which dominates perceived
/// lightness.
///
/// # Returns
/// A [`LevelsCorrection`] with both values clamped to [-50, 50]. An empty
/// histogram, or one whose white point does not exceed its black point
/// (a flat image), yields a zero contrast correction rather than a
/// division by zero.
pub fn auto_levels(histogram: &Histogram) -> LevelsCorrection {
    let total = histogram.total_count();
    if total == 0 {
        return LevelsCorrection::default();
    }

    let threshold = (((total as f64) * PERCENTILE_CLIP).ceil() as u64).max(1);

    let (black_r, white_r) = percentile_bounds(&histogram.red, threshold);
    let (black_g, white_g) = percentile_bounds(&histogram.green, threshold);
    let (black_b, white_b) = percentile_bounds(&histogram.blue, threshold);

    let black = black_r.min(black_g).min(black_b);
    let white = white_r.max(white_g).max(white_b);

    let weighted_brightness = 0.3 * channel_mean(&histogram.red, total)
        + 0.5 * channel_mean(&histogram.green, total)
        + 0.2 * channel_mean(&histogram.blue, total);

    let exposure = (((128.0 - weighted_brightness) / 128.0) * 50.0).clamp(-50.0, 50.0);

    let contrast = if white > black {
        let range = (white - black) as f32;
        (((220.0 / range) - 1.0) * 30.0).clamp(-50.0, 50.0)
    } else {
        0.0
    };

    LevelsCorrection { exposure, contrast }
}

/// Locate the black and white points of one channel.
///
/// Scans up from 0 and down from 255 until the cumulative count
/// reaches `threshold` pixels.
fn percentile_bounds(bins: &[u32; 256], threshold: u64) -> (u8, u8) {
    let mut cumulative: u64 = 0;
    let mut black: u8 = 0;
    for (value, &count) in bins.iter().enumerate() {
        cumulative += count as u64;
        if cumulative >= threshold {
            black = value as u8;
            break;
        }
    }

    let mut cumulative: u64 = 0;
    let mut white: u8 = 255;
    for (value, &count) in bins.iter().enumerate().rev() {
        cumulative += count as u64;
        if cumulative >= threshold {
            white = value as u8;
            break;
        }
    }

    (black, white)
}

/// Mean sample value of one channel.
fn channel_mean(bins: &[u32; 256], total: u64) -> f32 {
    let sum: u64 = bins
        .iter()
        .enumerate()
        .map(|(value, &count)| (value as u64) * (count as u64))
        .sum();
    (sum as f64 / total as f64) as f32
}


// ============================================================================
// Property-Based Tests
// ============================================================================
