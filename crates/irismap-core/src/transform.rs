//! Display transform state and affine matrix composition.
//!
//! The transform positions an image inside a viewport without ever
//! touching pixel data. It is baked into pixels only at export time,
//! through [`Affine::invert`] and an inverse-mapping resample.

/// Minimum allowed zoom scale.
pub const MIN_SCALE: f32 = 0.1;
/// Maximum allowed zoom scale.
pub const MAX_SCALE: f32 = 10.0;
/// Rotation applied per button press, in degrees.
pub const ROTATE_STEP_DEG: f32 = 5.0;
/// Multiplicative zoom applied per button press.
pub const ZOOM_STEP: f32 = 1.1;
/// Pan distance per button press, in display pixels.
pub const PAN_STEP_PX: f32 = 10.0;
/// Fraction of the viewport the auto-fit scale leaves as margin.
const AUTO_FIT_FACTOR: f32 = 0.8;

/// Viewport placement of one eye's image.
///
/// Translation is in display pixels relative to the viewport center,
/// rotation and skew are in degrees, and scale is a uniform zoom
/// factor kept within [`MIN_SCALE`]..[`MAX_SCALE`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformState {
    /// Horizontal offset from the viewport center, display px.
    pub translate_x: f32,
    /// Vertical offset from the viewport center, display px.
    pub translate_y: f32,
    /// Rotation in degrees, positive is clockwise on screen.
    pub rotation: f32,
    /// Horizontal skew in degrees.
    pub skew_x: f32,
    /// Vertical skew in degrees.
    pub skew_y: f32,
    scale: f32,
    fitted: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            translate_x: 0.0,
            translate_y: 0.0,
            rotation: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            scale: 1.0,
            fitted: false,
        }
    }
}

impl TransformState {
    /// Create a new identity transform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current zoom scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Set the zoom scale, clamped into the valid range.
    pub fn set_scale(&mut self, scale: f32) {
        self.scale = if scale.is_nan() {
            1.0
        } else {
            scale.clamp(MIN_SCALE, MAX_SCALE)
        };
    }

    /// Whether auto-fit has already run for the current image.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Rotate by `degrees` (positive is clockwise on screen).
    pub fn rotate_by(&mut self, degrees: f32) {
        self.rotation += degrees;
    }

    /// Zoom in one button step.
    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale * ZOOM_STEP);
    }

    /// Zoom out one button step.
    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale / ZOOM_STEP);
    }

    /// Translate by a display-pixel delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.translate_x += dx;
        self.translate_y += dy;
    }

    /// Multiply the scale by `factor`, keeping the display point under
    /// `(cursor_x, cursor_y)` visually stationary.
    ///
    /// The cursor is given in viewport coordinates (origin at the
    /// viewport's top-left). Solving for the compensating translate:
    /// with `c` the cursor relative to the viewport center and `k` the
    /// effective scale ratio, `t' = c - (c - t) * k`.
    pub fn zoom_at(
        &mut self,
        cursor_x: f32,
        cursor_y: f32,
        viewport_width: f32,
        viewport_height: f32,
        factor: f32,
    ) {
        let old_scale = self.scale;
        let new_scale = (old_scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        // Ratio after clamping, so the translate matches what actually applies.
        let k = new_scale / old_scale;

        let cx = cursor_x - viewport_width / 2.0;
        let cy = cursor_y - viewport_height / 2.0;
        self.translate_x = cx - (cx - self.translate_x) * k;
        self.translate_y = cy - (cy - self.translate_y) * k;
        self.scale = new_scale;
    }

    /// Fit the image inside the viewport with a 20% margin.
    ///
    /// One-shot: a no-op while the latch is set, so user zooming after
    /// the initial fit is never clobbered by a viewport resize. Resets
    /// translation and rotation but leaves skew alone.
    pub fn auto_fit(
        &mut self,
        viewport_width: f32,
        viewport_height: f32,
        image_width: u32,
        image_height: u32,
    ) {
        if self.fitted || image_width == 0 || image_height == 0 {
            return;
        }
        let fit_x = viewport_width / image_width as f32;
        let fit_y = viewport_height / image_height as f32;
        self.set_scale(fit_x.min(fit_y) * AUTO_FIT_FACTOR);
        self.translate_x = 0.0;
        self.translate_y = 0.0;
        self.rotation = 0.0;
        self.fitted = true;
    }

    /// Return to the identity transform and release the auto-fit latch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Build the image-to-display matrix for the given viewport.
    ///
    /// Composition order is fixed: translate to the viewport center,
    /// then user translate, rotate, scale, skew, and finally translate
    /// the image center to the origin. Image pixel (0,0) is the
    /// image's top-left corner.
    pub fn matrix(
        &self,
        viewport_width: f32,
        viewport_height: f32,
        image_width: u32,
        image_height: u32,
    ) -> Affine {
        Affine::translation(viewport_width / 2.0, viewport_height / 2.0)
            .compose(&Affine::translation(self.translate_x, self.translate_y))
            .compose(&Affine::rotation_degrees(self.rotation))
            .compose(&Affine::scaling(self.scale))
            .compose(&Affine::skew_degrees(self.skew_x, self.skew_y))
            .compose(&Affine::translation(
                -(image_width as f32) / 2.0,
                -(image_height as f32) / 2.0,
            ))
    }
}

/// 2x3 affine matrix mapping `(x, y)` to
/// `(m[0]*x + m[1]*y + m[2], m[3]*x + m[4]*y + m[5])`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    /// Row-major coefficients `[a, b, c, d, e, f]`.
    pub m: [f32; 6],
}

impl Affine {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    /// Pure translation.
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self {
            m: [1.0, 0.0, tx, 0.0, 1.0, ty],
        }
    }

    /// Rotation about the origin. Positive degrees rotate clockwise in
    /// screen coordinates (y down).
    pub fn rotation_degrees(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            m: [cos, -sin, 0.0, sin, cos, 0.0],
        }
    }

    /// Uniform scale about the origin.
    pub fn scaling(scale: f32) -> Self {
        Self {
            m: [scale, 0.0, 0.0, 0.0, scale, 0.0],
        }
    }

    /// Skew about the origin, angles in degrees.
    pub fn skew_degrees(skew_x: f32, skew_y: f32) -> Self {
        Self {
            m: [
                1.0,
                skew_x.to_radians().tan(),
                0.0,
                skew_y.to_radians().tan(),
                1.0,
                0.0,
            ],
        }
    }

    /// Compose with another transform, applying `other` first.
    pub fn compose(&self, other: &Affine) -> Affine {
        let a = &self.m;
        let b = &other.m;
        Affine {
            m: [
                a[0] * b[0] + a[1] * b[3],
                a[0] * b[1] + a[1] * b[4],
                a[0] * b[2] + a[1] * b[5] + a[2],
                a[3] * b[0] + a[4] * b[3],
                a[3] * b[1] + a[4] * b[4],
                a[3] * b[2] + a[4] * b[5] + a[5],
            ],
        }
    }

    /// Map one point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.m[0] * x + self.m[1] * y + self.m[2],
            self.m[3] * x + self.m[4] * y + self.m[5],
        )
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Affine> {
        let [a, b, c, d, e, f] = self.m;
        let det = a * e - b * d;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let ia = e * inv_det;
        let ib = -b * inv_det;
        let id = -d * inv_det;
        let ie = a * inv_det;
        Some(Affine {
            m: [ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)],
        })
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
