//! Irismap Core - Image compositing library
//!
//! This crate provides the core processing functionality for Irismap,
//! including the photographic adjustment pipeline, histogram computation,
//! auto-levels, display transforms, and grid overlay handling.

pub mod adjustments;
pub mod buffer;
pub mod color;
pub mod decode;
pub mod encode;
pub mod histogram;
pub mod levels;
pub mod overlay;
pub mod spatial;
pub mod transform;

pub use adjustments::apply_adjustments;
pub use buffer::PixelBuffer;
pub use histogram::compute_histogram;
pub use levels::{auto_levels, LevelsCorrection};
pub use overlay::{OverlayError, OverlayState};
pub use transform::{Affine, TransformState};

/// Photographic adjustments for one eye's image.
///
/// All fields default to zero, which is the identity transform.
/// Percent-like fields range -100 to 100, `hue` is in degrees
/// (-180 to 180) and `blur` is a non-negative pixel radius.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Adjustments {
    /// Exposure (-100 to 100), multiplies RGB by (100 + exposure) / 100
    pub exposure: f32,
    /// Contrast (-100 to 100), scaling about mid-gray
    pub contrast: f32,
    /// Saturation (-100 to 100), chroma scaling about per-pixel luma
    pub saturation: f32,
    /// Hue rotation in degrees (-180 to 180)
    pub hue: f32,
    /// Blur radius in pixels (0 to 100)
    pub blur: f32,
    /// Shadows (-100 to 100), luminance-weighted toward dark regions
    pub shadows: f32,
    /// Highlights (-100 to 100), luminance-weighted toward bright regions
    pub highlights: f32,
    /// Temperature (-100 to 100), positive shifts toward amber
    pub temperature: f32,
    /// Sharpness (-100 to 100), 3x3 unsharp convolution strength
    pub sharpness: f32,
}

/// Maximum blur radius accepted from the control surface, in pixels.
pub const MAX_BLUR_PX: f32 = 100.0;

/// One of the nine adjustment controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AdjustmentField {
    Exposure,
    Contrast,
    Saturation,
    Hue,
    Blur,
    Shadows,
    Highlights,
    Temperature,
    Sharpness,
}

impl AdjustmentField {
    /// The valid (min, max) domain for this control.
    pub fn domain(self) -> (f32, f32) {
        match self {
            AdjustmentField::Hue => (-180.0, 180.0),
            AdjustmentField::Blur => (0.0, MAX_BLUR_PX),
            _ => (-100.0, 100.0),
        }
    }

    /// Clamp a raw control value into this field's domain.
    pub fn clamp(self, value: f32) -> f32 {
        let (min, max) = self.domain();
        if value.is_nan() {
            return 0.0;
        }
        value.clamp(min, max)
    }
}

impl Adjustments {
    /// Create a new Adjustments with default (identity) values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if all values are at their defaults.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Check whether any per-pixel tone operator is active
    /// (everything except blur and sharpness).
    pub fn has_tone(&self) -> bool {
        self.exposure != 0.0
            || self.contrast != 0.0
            || self.saturation != 0.0
            || self.hue != 0.0
            || self.shadows != 0.0
            || self.highlights != 0.0
            || self.temperature != 0.0
    }

    /// Set one field, clamping the value into its domain.
    pub fn set(&mut self, field: AdjustmentField, value: f32) {
        let value = field.clamp(value);
        match field {
            AdjustmentField::Exposure => self.exposure = value,
            AdjustmentField::Contrast => self.contrast = value,
            AdjustmentField::Saturation => self.saturation = value,
            AdjustmentField::Hue => self.hue = value,
            AdjustmentField::Blur => self.blur = value,
            AdjustmentField::Shadows => self.shadows = value,
            AdjustmentField::Highlights => self.highlights = value,
            AdjustmentField::Temperature => self.temperature = value,
            AdjustmentField::Sharpness => self.sharpness = value,
        }
    }

    /// Read one field.
    pub fn get(&self, field: AdjustmentField) -> f32 {
        match field {
            AdjustmentField::Exposure => self.exposure,
            AdjustmentField::Contrast => self.contrast,
            AdjustmentField::Saturation => self.saturation,
            AdjustmentField::Hue => self.hue,
            AdjustmentField::Blur => self.blur,
            AdjustmentField::Shadows => self.shadows,
            AdjustmentField::Highlights => self.highlights,
            AdjustmentField::Temperature => self.temperature,
            AdjustmentField::Sharpness => self.sharpness,
        }
    }

    /// Return a copy with every field clamped into its domain.
    pub fn clamped(&self) -> Self {
        let mut out = Self::default();
        for field in [
            AdjustmentField::Exposure,
            AdjustmentField::Contrast,
            AdjustmentField::Saturation,
            AdjustmentField::Hue,
            AdjustmentField::Blur,
            AdjustmentField::Shadows,
            AdjustmentField::Highlights,
            AdjustmentField::Temperature,
            AdjustmentField::Sharpness,
        ] {
            out.set(field, self.get(field));
        }
        out
    }
}

/// Per-channel histogram of a rendered buffer.
///
/// Raw counts, no normalization. `red[v]` is the number of pixels
/// whose red sample equals `v`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    /// Red channel histogram (256 bins)
    pub red: [u32; 256],
    /// Green channel histogram (256 bins)
    pub green: [u32; 256],
    /// Blue channel histogram (256 bins)
    pub blue: [u32; 256],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
        }
    }
}

impl Histogram {
    /// Create a new empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the maximum count across all channels, for plot scaling.
    pub fn max_value(&self) -> u32 {
        let max_r = *self.red.iter().max().unwrap_or(&0);
        let max_g = *self.green.iter().max().unwrap_or(&0);
        let max_b = *self.blue.iter().max().unwrap_or(&0);
        max_r.max(max_g).max(max_b)
    }

    /// Total pixel count represented by this histogram.
    ///
    /// Every channel bins the same pixels, so the red channel's sum
    /// equals the pixel count of the source buffer.
    pub fn total_count(&self) -> u64 {
        self.red.iter().map(|&c| c as u64).sum()
    }

    /// True if no pixels have been binned.
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }
}
