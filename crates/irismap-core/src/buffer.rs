//! Pixel buffer type shared across the pipeline.

/// A decoded bitmap with RGBA pixel data.
///
/// Samples are row-major, 4 bytes per pixel, with straight
/// (non-premultiplied) alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA samples. Length is always width * height * 4.
    pub samples: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new PixelBuffer with the given dimensions and samples.
    ///
    /// # Panics
    /// If the sample length does not match width * height * 4.
    pub fn new(width: u32, height: u32, samples: Vec<u8>) -> Self {
        assert_eq!(
            samples.len(),
            (width as usize) * (height as usize) * 4,
            "Sample buffer size mismatch"
        );
        Self {
            width,
            height,
            samples,
        }
    }

    /// Create an opaque buffer filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        let mut samples = Vec::with_capacity(count * 4);
        for _ in 0..count {
            samples.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            samples,
        }
    }

    /// Create a PixelBuffer from an image::RgbaImage.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let samples = img.into_raw();
        Self {
            width,
            height,
            samples,
        }
    }

    /// Convert to an image::RgbaImage for encoding or resizing.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.samples.clone())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Get the size of the sample buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.samples.len()
    }

    /// Check if this is an empty/invalid buffer.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.samples.is_empty()
    }

    /// Read one pixel. Panics if out of bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.samples[idx],
            self.samples[idx + 1],
            self.samples[idx + 2],
            self.samples[idx + 3],
        ]
    }
}
