//! Shared colorspace and interpolation utilities.
//!
//! Single source of truth for the luminance weighting, HSL conversion
//! and smoothstep blending used across the adjustment pipeline, the
//! histogram engine and auto-levels.

/// ITU-R BT.709 coefficient for red channel in luminance calculation.
pub const LUMINANCE_R: f32 = 0.2126;

/// ITU-R BT.709 coefficient for green channel in luminance calculation.
pub const LUMINANCE_G: f32 = 0.7152;

/// ITU-R BT.709 coefficient for blue channel in luminance calculation.
pub const LUMINANCE_B: f32 = 0.0722;

/// Calculate luminance from normalized RGB values (0.0 to 1.0).
#[inline]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMINANCE_R * r + LUMINANCE_G * g + LUMINANCE_B * b
}

/// Calculate luminance from u8 RGB values (0 to 255).
#[inline]
pub fn luminance_u8(r: u8, g: u8, b: u8) -> u8 {
    let lum = LUMINANCE_R * r as f32 + LUMINANCE_G * g as f32 + LUMINANCE_B * b as f32;
    lum.clamp(0.0, 255.0).round() as u8
}

/// Smooth interpolation function.
///
/// Returns 0 for x <= edge0, 1 for x >= edge1,
/// and smoothly interpolates between.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Convert normalized RGB to HSL.
///
/// Returns (hue in degrees 0..360, saturation 0..1, lightness 0..1).
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < f32::EPSILON {
        // Achromatic
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h * 60.0, s, l)
}

/// Convert HSL back to normalized RGB.
///
/// Hue is in degrees (any value, wrapped into 0..360); saturation and
/// lightness are 0..1.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (l, l, l);
    }

    let h = (h.rem_euclid(360.0)) / 360.0;
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

#[inline]
fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients_sum_to_one() {
        let sum = LUMINANCE_R + LUMINANCE_G + LUMINANCE_B;
        assert!((sum - 1.0).abs() < 1e-6, "Coefficients should sum to 1.0");
    }

    #[test]
    fn test_luminance_extremes() {
        assert!((luminance(1.0, 1.0, 1.0) - 1.0).abs() < f32::EPSILON);
        assert!((luminance(0.0, 0.0, 0.0) - 0.0).abs() < f32::EPSILON);
        assert_eq!(luminance_u8(255, 255, 255), 255);
        assert_eq!(luminance_u8(0, 0, 0), 0);
    }

    #[test]
    fn test_luminance_gray_preserves_value() {
        for v in [0u8, 64, 128, 192, 255] {
            let lum = luminance_u8(v, v, v);
            assert!(
                (lum as i32 - v as i32).abs() <= 1,
                "Gray {} should produce luminance ~{}, got {}",
                v,
                v,
                lum
            );
        }
    }

    #[test]
    fn test_smoothstep_boundaries() {
        assert!((smoothstep(0.0, 1.0, -0.5) - 0.0).abs() < f32::EPSILON);
        assert!((smoothstep(0.0, 1.0, 0.0) - 0.0).abs() < f32::EPSILON);
        assert!((smoothstep(0.0, 1.0, 1.0) - 1.0).abs() < f32::EPSILON);
        assert!((smoothstep(0.0, 1.0, 1.5) - 1.0).abs() < f32::EPSILON);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_smoothstep_descending_edges() {
        // Edges can run high-to-low, used for the shadow mask
        assert!((smoothstep(0.5, 0.0, 0.0) - 1.0).abs() < f32::EPSILON);
        assert!((smoothstep(0.5, 0.0, 0.5) - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hsl_primaries() {
        let (h, s, l) = rgb_to_hsl(1.0, 0.0, 0.0);
        assert!((h - 0.0).abs() < 0.01);
        assert!((s - 1.0).abs() < 0.01);
        assert!((l - 0.5).abs() < 0.01);

        let (h, _, _) = rgb_to_hsl(0.0, 1.0, 0.0);
        assert!((h - 120.0).abs() < 0.01);

        let (h, _, _) = rgb_to_hsl(0.0, 0.0, 1.0);
        assert!((h - 240.0).abs() < 0.01);
    }

    #[test]
    fn test_hsl_achromatic() {
        let (h, s, l) = rgb_to_hsl(0.5, 0.5, 0.5);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 0.5).abs() < f32::EPSILON);

        let (r, g, b) = hsl_to_rgb(77.0, 0.0, 0.5);
        assert!((r - 0.5).abs() < f32::EPSILON);
        assert!((g - 0.5).abs() < f32::EPSILON);
        assert!((b - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_hsl_round_trip() {
        let cases = [
            (0.8, 0.2, 0.1),
            (0.1, 0.9, 0.3),
            (0.2, 0.4, 0.95),
            (0.33, 0.33, 0.34),
        ];
        for (r, g, b) in cases {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r2, g2, b2) = hsl_to_rgb(h, s, l);
            assert!((r - r2).abs() < 1e-4, "red mismatch for {:?}", (r, g, b));
            assert!((g - g2).abs() < 1e-4, "green mismatch for {:?}", (r, g, b));
            assert!((b - b2).abs() < 1e-4, "blue mismatch for {:?}", (r, g, b));
        }
    }

    #[test]
    fn test_hue_wraps() {
        // 360-degree rotation comes back to the same color
        let (r, g, b) = hsl_to_rgb(360.0, 1.0, 0.5);
        assert!((r - 1.0).abs() < 1e-4);
        assert!(g.abs() < 1e-4);
        assert!(b.abs() < 1e-4);

        // Negative hues wrap from the other side
        let (r2, g2, b2) = hsl_to_rgb(-120.0, 1.0, 0.5);
        let (r3, g3, b3) = hsl_to_rgb(240.0, 1.0, 0.5);
        assert!((r2 - r3).abs() < 1e-4);
        assert!((g2 - g3).abs() < 1e-4);
        assert!((b2 - b3).abs() < 1e-4);
    }
}
