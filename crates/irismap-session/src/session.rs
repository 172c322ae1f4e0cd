//! Per-eye editing sessions and the mapper that coordinates them.
//!
//! Each eye owns its complete editing state. The [`Mapper`] routes
//! control-surface commands to the active eye, or to both eyes when the
//! dual view is on, and enforces the stale-render discard rule through
//! per-session generation counters.

use irismap_core::levels::LevelsCorrection;
use irismap_core::overlay::{grid_file_name, OverlayError};
use irismap_core::{
    apply_adjustments, auto_levels, compute_histogram, Adjustments, AdjustmentField, Histogram,
    OverlayState, PixelBuffer, TransformState,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::grids::{GridError, GridSource};
use crate::scheduler::RenderOutput;

/// Which eye a command or grid file refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// The single-letter id used in grid file names.
    pub fn id(self) -> &'static str {
        match self {
            Eye::Left => "L",
            Eye::Right => "R",
        }
    }

    /// The opposite eye.
    pub fn other(self) -> Eye {
        match self {
            Eye::Left => Eye::Right,
            Eye::Right => Eye::Left,
        }
    }

    /// Both eyes, left first.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub(crate) fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

impl Default for Eye {
    fn default() -> Self {
        Eye::Left
    }
}

/// Errors surfaced by session commands. All are recoverable; the
/// session state that existed before the failing command is intact.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The command needs a loaded photograph
    #[error("No image loaded for the {0:?} eye")]
    NoImage(Eye),

    /// A grid could not be fetched
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Grid markup was rejected or could not be rewritten
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

/// The complete editing state of one eye.
///
/// The source buffer is immutable once loaded; adjustments and the
/// display transform describe how it is shown, and `rendered` caches
/// the most recent completed pipeline output together with its
/// histogram. The generation counter changes only when the source
/// image is replaced, so results computed against an older image can
/// never be written back. Background submissions are tracked by
/// sequence so a result whose parameters were superseded before it
/// arrived is rejected as well.
#[derive(Debug, Clone, Default)]
pub struct EyeSession {
    source: Option<PixelBuffer>,
    pub adjustments: Adjustments,
    pub transform: TransformState,
    pub overlay: OverlayState,
    rendered: Option<PixelBuffer>,
    histogram: Histogram,
    generation: u64,
    pending_sequence: Option<u64>,
}

impl EyeSession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the photograph. Adjustments reset to identity, the
    /// auto-fit latch releases, and the generation advances so pending
    /// renders of the old image are discarded on arrival.
    pub fn load_image(&mut self, image: PixelBuffer) {
        self.generation += 1;
        self.pending_sequence = None;
        self.source = Some(image);
        self.adjustments = Adjustments::default();
        self.transform.reset();
        self.rendered = None;
        self.histogram = Histogram::new();
    }

    /// The unmodified photograph, if loaded.
    pub fn source(&self) -> Option<&PixelBuffer> {
        self.source.as_ref()
    }

    /// True once a photograph is loaded.
    pub fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// The image generation. Advances on every [`load_image`](Self::load_image).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The latest completed pipeline output, falling back to the
    /// source if nothing has rendered yet.
    pub fn display_buffer(&self) -> Option<&PixelBuffer> {
        self.rendered.as_ref().or(self.source.as_ref())
    }

    /// Histogram of the latest completed render.
    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Record that a background job with this sequence was submitted
    /// for this session. Only results at least this new are accepted
    /// afterwards.
    pub fn track_submission(&mut self, sequence: u64) {
        self.pending_sequence = Some(match self.pending_sequence {
            Some(latest) => latest.max(sequence),
            None => sequence,
        });
    }

    /// Drop any tracked submission, so in-flight results are rejected
    /// on arrival. Used when the eye loses focus before its render
    /// lands.
    pub fn discard_pending(&mut self) {
        self.pending_sequence = None;
    }

    /// True while a tracked submission has not delivered yet.
    pub fn has_pending(&self) -> bool {
        self.pending_sequence.is_some()
    }

    /// Store a completed render, discarding it if it was computed
    /// against a replaced image or if a newer submission (or a
    /// [`discard_pending`](Self::discard_pending)) superseded it.
    ///
    /// # Returns
    /// `true` if the result was accepted.
    pub fn accept_render(
        &mut self,
        generation: u64,
        sequence: u64,
        buffer: PixelBuffer,
        histogram: Histogram,
    ) -> bool {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                "Discarding render for replaced image"
            );
            return false;
        }
        match self.pending_sequence {
            Some(latest) if sequence >= latest => {}
            _ => {
                debug!(sequence, "Discarding superseded render");
                return false;
            }
        }
        self.pending_sequence = None;
        self.rendered = Some(buffer);
        self.histogram = histogram;
        true
    }

    /// Run the adjustment pipeline synchronously and cache the result.
    ///
    /// The interactive path goes through the scheduler instead; this is
    /// for export and for callers that need an up-to-date histogram
    /// immediately.
    pub fn render_now(&mut self) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        let rendered = apply_adjustments(source, &self.adjustments);
        // Anything still in flight predates this result.
        self.pending_sequence = None;
        self.histogram = compute_histogram(&rendered);
        self.rendered = Some(rendered);
        true
    }
}

/// Coordinator for the two eye sessions and the dual view.
///
/// Commands address the active eye; when the dual view is on,
/// parameter commands broadcast the same value into both sessions.
#[derive(Debug, Default)]
pub struct Mapper {
    sessions: [EyeSession; 2],
    active: Eye,
    dual: bool,
}

impl Mapper {
    /// Create a mapper with two empty sessions, left eye active.
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for one eye.
    pub fn session(&self, eye: Eye) -> &EyeSession {
        &self.sessions[eye.index()]
    }

    /// Mutable access to one eye's session.
    pub fn session_mut(&mut self, eye: Eye) -> &mut EyeSession {
        &mut self.sessions[eye.index()]
    }

    /// The currently active eye.
    pub fn active_eye(&self) -> Eye {
        self.active
    }

    /// The active eye's session.
    pub fn active_session(&self) -> &EyeSession {
        self.session(self.active)
    }

    /// Whether both eyes are shown side by side.
    pub fn is_dual(&self) -> bool {
        self.dual
    }

    /// Toggle the dual view.
    pub fn set_dual(&mut self, dual: bool) {
        self.dual = dual;
    }

    /// Eyes affected by a broadcastable command: both in dual view,
    /// otherwise just the active one.
    pub fn affected_eyes(&self) -> Vec<Eye> {
        if self.dual {
            Eye::BOTH.to_vec()
        } else {
            vec![self.active]
        }
    }

    /// The eye whose histogram the control surface shows: left in dual
    /// view, otherwise the active eye.
    pub fn reference_eye(&self) -> Eye {
        if self.dual {
            Eye::Left
        } else {
            self.active
        }
    }

    /// Histogram of the reference eye.
    pub fn histogram(&self) -> &Histogram {
        self.session(self.reference_eye()).histogram()
    }

    /// Make `eye` active, invalidating any render still in flight for
    /// the previously active eye.
    ///
    /// # Returns
    /// The new active eye's adjustments, so the control surface can
    /// sync its sliders.
    pub fn switch_eye(&mut self, eye: Eye) -> Adjustments {
        let previous = self.active;
        if previous != eye {
            self.session_mut(previous).discard_pending();
        }
        self.active = eye;
        debug!(eye = ?eye, "Switched active eye");
        self.session(eye).adjustments.clone()
    }

    /// Route a finished background render into its eye's session,
    /// applying the stale-generation and superseded-sequence checks.
    ///
    /// # Returns
    /// `true` if the result was accepted.
    pub fn apply_render(&mut self, output: RenderOutput) -> bool {
        self.session_mut(output.eye).accept_render(
            output.generation,
            output.sequence,
            output.buffer,
            output.histogram,
        )
    }

    /// Load a photograph into the active eye, or into both eyes in
    /// dual view.
    pub fn load_image(&mut self, image: PixelBuffer) {
        info!(
            eyes = ?self.affected_eyes(),
            width = image.width,
            height = image.height,
            "Loading image"
        );
        let affected = self.affected_eyes();
        if let Some((last, rest)) = affected.split_last() {
            for eye in rest {
                self.session_mut(*eye).load_image(image.clone());
            }
            self.session_mut(*last).load_image(image);
        }
    }

    /// Set one adjustment control, clamped into its domain, on every
    /// affected eye.
    pub fn set_adjustment(&mut self, field: AdjustmentField, value: f32) {
        for eye in self.affected_eyes() {
            self.session_mut(eye).adjustments.set(field, value);
        }
    }

    /// Reset all adjustment controls on every affected eye.
    pub fn reset_adjustments(&mut self) {
        for eye in self.affected_eyes() {
            self.session_mut(eye).adjustments = Adjustments::default();
        }
    }

    /// Compute auto-levels from the reference eye's current pixels and
    /// replace the exposure and contrast controls with the suggestion.
    ///
    /// # Errors
    /// [`SessionError::NoImage`] when the reference eye has no
    /// photograph loaded.
    pub fn auto_levels(&mut self) -> Result<LevelsCorrection, SessionError> {
        let reference = self.reference_eye();
        let session = self.session_mut(reference);
        if !session.render_now() {
            return Err(SessionError::NoImage(reference));
        }
        let correction = auto_levels(session.histogram());
        info!(
            exposure = correction.exposure,
            contrast = correction.contrast,
            "Applying auto-levels"
        );
        for eye in self.affected_eyes() {
            let adjustments = &mut self.session_mut(eye).adjustments;
            adjustments.set(AdjustmentField::Exposure, correction.exposure);
            adjustments.set(AdjustmentField::Contrast, correction.contrast);
        }
        Ok(correction)
    }

    /// Load a named map's grids into every affected eye, each eye
    /// getting its own file per the `{map}_{eye}.svg` convention.
    ///
    /// # Errors
    /// A fetch or sanitization failure is returned without touching
    /// any eye's current overlay.
    pub fn load_map(
        &mut self,
        source: &dyn GridSource,
        map_name: &str,
    ) -> Result<(), SessionError> {
        let affected = self.affected_eyes();
        // Fetch and sanitize everything before mutating any overlay, so
        // a failure on the second eye cannot leave the pair mismatched.
        let mut sanitized = Vec::with_capacity(affected.len());
        for eye in &affected {
            let file_name = grid_file_name(map_name, eye.id());
            let markup = source.fetch(&file_name).map_err(|error| {
                warn!(file = %file_name, %error, "Grid fetch failed");
                error
            })?;
            let mut staged = OverlayState::new();
            staged.set_content(&markup)?;
            sanitized.push(staged.content().map(str::to_string));
        }
        for (eye, content) in affected.into_iter().zip(sanitized) {
            let overlay = &mut self.session_mut(eye).overlay;
            match content {
                // Re-sanitizing already-sanitized markup cannot fail.
                Some(markup) => overlay.set_content(&markup)?,
                None => overlay.clear(),
            }
        }
        info!(map = %map_name, "Loaded map grids");
        Ok(())
    }

    /// Load custom uploaded grid markup into every affected eye.
    ///
    /// # Errors
    /// Sanitization failure leaves every current overlay intact.
    pub fn load_custom_grid(&mut self, markup: &str) -> Result<(), SessionError> {
        // Validate once up front; per-eye stores then cannot fail halfway.
        let mut staged = OverlayState::new();
        staged.set_content(markup)?;
        let sanitized = staged.content().unwrap_or_default().to_string();
        for eye in self.affected_eyes() {
            self.session_mut(eye).overlay.set_content(&sanitized)?;
        }
        Ok(())
    }

    /// Remove the grid from every affected eye.
    pub fn clear_grid(&mut self) {
        for eye in self.affected_eyes() {
            self.session_mut(eye).overlay.clear();
        }
    }

    /// Set the map color on every affected eye.
    pub fn set_map_color(&mut self, color: &str) -> Result<(), SessionError> {
        for eye in self.affected_eyes() {
            self.session_mut(eye).overlay.set_color(color)?;
        }
        Ok(())
    }

    /// Set the overlay opacity on every affected eye.
    pub fn set_overlay_opacity(&mut self, opacity: f32) {
        for eye in self.affected_eyes() {
            self.session_mut(eye).overlay.set_opacity(opacity);
        }
    }

    /// Mutable transform of the active eye, for pan/zoom/rotate/skew
    /// commands. Transforms are always per eye, never broadcast.
    pub fn transform_mut(&mut self) -> &mut TransformState {
        &mut self.sessions[self.active.index()].transform
    }
}
