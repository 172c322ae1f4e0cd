//! Photographic adjustment pipeline.
//!
//! Applies the nine adjustments to RGBA pixel data.
//!
//! ## Pipeline Order
//! 1. Exposure
//! 2. Contrast
//! 3. Saturation
//! 4. Hue rotation
//! 5. Temperature
//! 6. Highlights
//! 7. Shadows
//! 8. Blur (spatial)
//! 9. Sharpness (spatial)
//!
//! Steps 1-7 are fused into a single per-pixel float function so the
//! channel values are quantized back to u8 exactly once, avoiding the
//! compounding rounding error of sequential full-buffer passes. Blur and
//! sharpness are neighborhood-dependent and run afterwards on
//! independent buffers (see the spatial module).

use crate::color::{hsl_to_rgb, luminance, rgb_to_hsl, smoothstep};
use crate::spatial::{gaussian_blur, sharpen};
use crate::{Adjustments, PixelBuffer};

/// Run the full adjustment pipeline on a source buffer.
///
/// The source is never modified; identity parameters return an exact
/// copy. Out-of-domain parameter values are clamped, never an error.
///
/// # Example
/// ```
/// use irismap_core::{apply_adjustments, Adjustments, PixelBuffer};
///
/// let src = PixelBuffer::solid(2, 2, [100, 100, 100, 255]);
/// let mut adj = Adjustments::default();
/// adj.exposure = 50.0;
///
/// let out = apply_adjustments(&src, &adj);
/// assert_eq!(out.pixel(0, 0), [150, 150, 150, 255]);
/// ```
pub fn apply_adjustments(source: &PixelBuffer, adjustments: &Adjustments) -> PixelBuffer {
    let adjustments = adjustments.clamped();

    // Identity law: untouched parameters reproduce the source exactly
    if adjustments.is_default() {
        return source.clone();
    }

    let mut out = source.clone();
    if adjustments.has_tone() {
        apply_tone(&mut out.samples, &adjustments);
    }

    let out = if adjustments.blur > 0.0 {
        gaussian_blur(&out, adjustments.blur)
    } else {
        out
    };

    if adjustments.sharpness != 0.0 {
        sharpen(&out, adjustments.sharpness)
    } else {
        out
    }
}

/// Apply the fused per-pixel tone operators to RGBA samples in place.
///
/// Alpha is preserved untouched. Callers pass pre-clamped parameters;
/// `apply_adjustments` is the public entry point.
pub fn apply_tone(samples: &mut [u8], adjustments: &Adjustments) {
    for chunk in samples.chunks_exact_mut(4) {
        let r = chunk[0] as f32 / 255.0;
        let g = chunk[1] as f32 / 255.0;
        let b = chunk[2] as f32 / 255.0;

        let (r, g, b) = tone_pixel(r, g, b, adjustments);

        chunk[0] = (r.clamp(0.0, 1.0) * 255.0).round() as u8;
        chunk[1] = (g.clamp(0.0, 1.0) * 255.0).round() as u8;
        chunk[2] = (b.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

/// The fused tone transform for one pixel, in normalized float space.
#[inline]
fn tone_pixel(r: f32, g: f32, b: f32, adj: &Adjustments) -> (f32, f32, f32) {
    let (r, g, b) = apply_exposure(r, g, b, adj.exposure);
    let (r, g, b) = apply_contrast(r, g, b, adj.contrast);
    let (r, g, b) = apply_saturation(r, g, b, adj.saturation);
    let (r, g, b) = apply_hue(r, g, b, adj.hue);
    let (r, g, b) = apply_temperature(r, g, b, adj.temperature);

    let lum = luminance(r, g, b);
    let (r, g, b) = apply_highlights(r, g, b, lum, adj.highlights);
    apply_shadows(r, g, b, lum, adj.shadows)
}

/// Apply exposure adjustment.
///
/// Exposure ranges from -100 to 100 and multiplies all channels by
/// `(100 + exposure) / 100`.
#[inline]
fn apply_exposure(r: f32, g: f32, b: f32, exposure: f32) -> (f32, f32, f32) {
    if exposure == 0.0 {
        return (r, g, b);
    }
    let multiplier = (100.0 + exposure) / 100.0;
    (r * multiplier, g * multiplier, b * multiplier)
}

/// Apply contrast adjustment.
///
/// Contrast ranges from -100 to 100 and scales channel values about
/// mid-gray with factor `(100 + contrast) / 100`.
#[inline]
fn apply_contrast(r: f32, g: f32, b: f32, contrast: f32) -> (f32, f32, f32) {
    if contrast == 0.0 {
        return (r, g, b);
    }
    let factor = (100.0 + contrast) / 100.0;
    let midpoint = 0.5;
    (
        (r - midpoint) * factor + midpoint,
        (g - midpoint) * factor + midpoint,
        (b - midpoint) * factor + midpoint,
    )
}

/// Apply saturation adjustment.
///
/// Saturation ranges from -100 to 100 and scales chroma relative to the
/// per-pixel luma by `(100 + saturation) / 100`. At -100 the pixel
/// collapses to its luminance gray.
#[inline]
fn apply_saturation(r: f32, g: f32, b: f32, saturation: f32) -> (f32, f32, f32) {
    if saturation == 0.0 {
        return (r, g, b);
    }
    let gray = luminance(r, g, b);
    let factor = (100.0 + saturation) / 100.0;
    (
        gray + (r - gray) * factor,
        gray + (g - gray) * factor,
        gray + (b - gray) * factor,
    )
}

/// Apply hue rotation.
///
/// Hue ranges from -180 to 180 degrees and rotates the hue angle in HSL
/// space, preserving saturation and lightness.
#[inline]
fn apply_hue(r: f32, g: f32, b: f32, hue: f32) -> (f32, f32, f32) {
    if hue == 0.0 {
        return (r, g, b);
    }
    // Channels can sit outside 0..1 after contrast; clamp for the
    // conversion so the HSL math stays well defined.
    let (h, s, l) = rgb_to_hsl(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0));
    hsl_to_rgb(h + hue, s, l)
}

/// Apply temperature (white balance) adjustment.
///
/// Temperature ranges from -100 to 100.
/// - Positive = warmer: raise red, reduce blue (toward amber)
/// - Negative = cooler: reduce red, raise blue
#[inline]
fn apply_temperature(r: f32, g: f32, b: f32, temperature: f32) -> (f32, f32, f32) {
    if temperature == 0.0 {
        return (r, g, b);
    }
    let shift = temperature.abs() / 100.0 * 0.3;
    if temperature > 0.0 {
        (r * (1.0 + shift), g, b * (1.0 - shift))
    } else {
        (r * (1.0 - shift), g, b * (1.0 + shift))
    }
}

/// Apply highlights adjustment.
///
/// Highlights range from -100 to 100 and affect bright areas
/// (luminance > 0.5) through a smoothstep mask, so midtones and shadow
/// regions are left nearly untouched and there is no hard split point.
#[inline]
fn apply_highlights(r: f32, g: f32, b: f32, lum: f32, highlights: f32) -> (f32, f32, f32) {
    if highlights == 0.0 {
        return (r, g, b);
    }
    let mask = smoothstep(0.5, 1.0, lum);
    let adjustment = (highlights / 100.0) * mask;

    if highlights < 0.0 {
        // Pull highlights down: multiply by factor < 1
        let factor = 1.0 + adjustment; // adjustment is negative
        (r * factor, g * factor, b * factor)
    } else {
        // Push highlights toward white
        let boost = adjustment * 0.5;
        (r + boost, g + boost, b + boost)
    }
}

/// Apply shadows adjustment.
///
/// Shadows range from -100 to 100 and affect dark areas
/// (luminance < 0.5) through a smoothstep mask, mirroring the
/// highlights control.
#[inline]
fn apply_shadows(r: f32, g: f32, b: f32, lum: f32, shadows: f32) -> (f32, f32, f32) {
    if shadows == 0.0 {
        return (r, g, b);
    }
    let mask = smoothstep(0.5, 0.0, lum);
    let adjustment = (shadows / 100.0) * mask;

    if shadows < 0.0 {
        // Deepen shadows: multiply by factor < 1
        let factor = 1.0 + adjustment; // adjustment is negative
        (r * factor, g * factor, b * factor)
    } else {
        // Lift shadows toward white
        let boost = adjustment * 0.5;
        (r + boost, g + boost, b + boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::luminance_u8;

    /// Helper to build a 1x1 buffer from an opaque RGB value.
    fn pixel(r: u8, g: u8, b: u8) -> PixelBuffer {
        PixelBuffer::solid(1, 1, [r, g, b, 255])
    }

    fn apply(buf: &PixelBuffer, adj: &Adjustments) -> [u8; 4] {
        apply_adjustments(buf, adj).pixel(0, 0)
    }

    // ===== Identity Tests =====

    #[test]
    fn test_identity_no_adjustments() {
        let src = pixel(128, 64, 192);
        let adj = Adjustments::default();
        let out = apply_adjustments(&src, &adj);
        assert_eq!(out, src, "Default adjustments should not change pixels");
    }

    #[test]
    fn test_identity_black_and_white() {
        for rgba in [[0, 0, 0, 255], [255, 255, 255, 255]] {
            let src = PixelBuffer::solid(3, 3, rgba);
            let out = apply_adjustments(&src, &Adjustments::default());
            assert_eq!(out, src);
        }
    }

    #[test]
    fn test_alpha_preserved() {
        let src = PixelBuffer::solid(2, 2, [100, 100, 100, 77]);
        let mut adj = Adjustments::default();
        adj.exposure = 50.0;
        let out = apply_adjustments(&src, &adj);
        assert_eq!(out.pixel(0, 0)[3], 77);
    }

    // ===== Exposure Tests =====

    #[test]
    fn test_exposure_plus_fifty() {
        let src = pixel(100, 100, 100);
        let mut adj = Adjustments::default();
        adj.exposure = 50.0;
        assert_eq!(apply(&src, &adj), [150, 150, 150, 255]);
    }

    #[test]
    fn test_exposure_clips_at_white() {
        let src = pixel(200, 200, 200);
        let mut adj = Adjustments::default();
        adj.exposure = 100.0;
        assert_eq!(apply(&src, &adj), [255, 255, 255, 255]);
    }

    #[test]
    fn test_exposure_negative_darkens() {
        let src = pixel(100, 100, 100);
        let mut adj = Adjustments::default();
        adj.exposure = -50.0;
        assert_eq!(apply(&src, &adj), [50, 50, 50, 255]);
    }

    #[test]
    fn test_exposure_monotonic_in_mean_luminance() {
        let src = pixel(90, 110, 70);
        let mut prev = 0u8;
        for e in [-80.0, -40.0, 0.0, 40.0, 80.0] {
            let mut adj = Adjustments::default();
            adj.exposure = e;
            let [r, g, b, _] = apply(&src, &adj);
            let lum = luminance_u8(r, g, b);
            assert!(
                lum >= prev,
                "Mean luminance should not decrease as exposure grows (e={})",
                e
            );
            prev = lum;
        }
    }

    // ===== Contrast Tests =====

    #[test]
    fn test_contrast_positive_spreads_about_midgray() {
        let mut adj = Adjustments::default();
        adj.contrast = 100.0;

        let dark = apply(&pixel(64, 64, 64), &adj);
        assert!(dark[0] < 64, "Dark pixel should get darker");

        let mid = apply(&pixel(128, 128, 128), &adj);
        assert!((mid[0] as i32 - 128).abs() < 5, "Mid pixel stays near middle");

        let bright = apply(&pixel(192, 192, 192), &adj);
        assert_eq!(bright[0], 255, "Bright pixel should clip at white");
    }

    #[test]
    fn test_contrast_negative_compresses() {
        let mut adj = Adjustments::default();
        adj.contrast = -50.0;

        let out = apply(&pixel(0, 128, 255), &adj);
        assert!(out[0] > 0, "Black should move toward gray");
        assert!((out[1] as i32 - 128).abs() < 5);
        assert!(out[2] < 255, "White should move toward gray");
    }

    // ===== Saturation Tests =====

    #[test]
    fn test_saturation_increase() {
        let src = pixel(200, 128, 100);
        let mut adj = Adjustments::default();
        adj.saturation = 50.0;
        let out = apply(&src, &adj);
        let orig_diff = (200 - 100) as i32;
        let new_diff = (out[0] as i32 - out[2] as i32).abs();
        assert!(new_diff > orig_diff, "Color difference should increase");
    }

    #[test]
    fn test_saturation_full_desaturate_is_gray() {
        let src = pixel(200, 128, 100);
        let mut adj = Adjustments::default();
        adj.saturation = -100.0;
        let out = apply(&src, &adj);
        assert!((out[0] as i32 - out[1] as i32).abs() <= 1);
        assert!((out[1] as i32 - out[2] as i32).abs() <= 1);
    }

    // ===== Hue Tests =====

    #[test]
    fn test_hue_rotation_red_to_green() {
        let src = pixel(255, 0, 0);
        let mut adj = Adjustments::default();
        adj.hue = 120.0;
        let out = apply(&src, &adj);
        assert!(out[1] > 200, "Red rotated +120 degrees should be green");
        assert!(out[0] < 30);
        assert!(out[2] < 30);
    }

    #[test]
    fn test_hue_preserves_gray() {
        let src = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.hue = 90.0;
        let out = apply(&src, &adj);
        assert!((out[0] as i32 - 128).abs() <= 1, "Gray has no hue to rotate");
        assert!((out[1] as i32 - 128).abs() <= 1);
        assert!((out[2] as i32 - 128).abs() <= 1);
    }

    // ===== Temperature Tests =====

    #[test]
    fn test_temperature_warm() {
        let src = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.temperature = 100.0;
        let out = apply(&src, &adj);
        assert!(out[0] > 128, "Red should increase for warm");
        assert!(out[2] < 128, "Blue should decrease for warm");
        assert_eq!(out[1], 128, "Green stays put");
    }

    #[test]
    fn test_temperature_cool() {
        let src = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.temperature = -100.0;
        let out = apply(&src, &adj);
        assert!(out[0] < 128, "Red should decrease for cool");
        assert!(out[2] > 128, "Blue should increase for cool");
    }

    #[test]
    fn test_temperature_magnitude_scales_shift() {
        let src = pixel(128, 128, 128);
        let mut small = Adjustments::default();
        small.temperature = 25.0;
        let mut large = Adjustments::default();
        large.temperature = 100.0;
        let s = apply(&src, &small);
        let l = apply(&src, &large);
        assert!(l[0] - 128 > s[0] - 128, "Larger magnitude shifts further");
    }

    // ===== Shadows/Highlights Tests =====

    #[test]
    fn test_shadows_affect_dark_more_than_bright() {
        let mut adj = Adjustments::default();
        adj.shadows = -50.0;

        // Luminance ~0.2
        let dark_src = pixel(51, 51, 51);
        let dark_out = apply(&dark_src, &adj);
        let dark_delta = 51i32 - dark_out[0] as i32;
        assert!(dark_delta > 0, "Dark pixel should be darkened");

        // Luminance ~0.9
        let bright_src = pixel(230, 230, 230);
        let bright_out = apply(&bright_src, &adj);
        let bright_delta = (230i32 - bright_out[0] as i32).abs();
        assert!(
            (bright_delta as f32) < dark_delta as f32 * 0.1,
            "Bright pixel delta {} should be under 10% of dark delta {}",
            bright_delta,
            dark_delta
        );
    }

    #[test]
    fn test_highlights_affect_bright_only() {
        let mut adj = Adjustments::default();
        adj.highlights = 50.0;

        let dark = apply(&pixel(30, 30, 30), &adj);
        assert!((dark[0] as i32 - 30).abs() < 5, "Dark pixels barely change");

        let bright = apply(&pixel(230, 230, 230), &adj);
        assert!(bright[0] > 230, "Bright pixels are lifted");
    }

    #[test]
    fn test_shadow_response_has_no_banding_step() {
        // Walk luminance upward; the applied delta must change smoothly,
        // never jumping at the mid-luminance split.
        let mut adj = Adjustments::default();
        adj.shadows = -80.0;
        let mut prev_delta = i32::MAX;
        for v in (8..=248).step_by(8) {
            let out = apply(&pixel(v, v, v), &adj);
            let delta = v as i32 - out[0] as i32;
            let jump = (prev_delta - delta).abs();
            if prev_delta != i32::MAX {
                assert!(jump < 12, "Discontinuity at value {}: jump {}", v, jump);
            }
            prev_delta = delta;
        }
    }

    // ===== Combined / extreme =====

    #[test]
    fn test_extreme_values_dont_panic() {
        let src = pixel(128, 128, 128);
        let adj = Adjustments {
            exposure: 100.0,
            contrast: 100.0,
            saturation: 100.0,
            hue: 180.0,
            blur: 4.0,
            shadows: 100.0,
            highlights: 100.0,
            temperature: 100.0,
            sharpness: 100.0,
        };
        let out = apply_adjustments(&src, &adj);
        assert_eq!(out.byte_size(), src.byte_size());
    }

    #[test]
    fn test_out_of_domain_values_clamp() {
        let src = pixel(100, 100, 100);
        let mut adj = Adjustments::default();
        adj.exposure = 5000.0; // clamps to 100
        let clamped = apply(&src, &adj);
        adj.exposure = 100.0;
        let exact = apply(&src, &adj);
        assert_eq!(clamped, exact);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================
