//! Debounced, superseding background render pipeline.
//!
//! Slider drags emit parameter changes far faster than the pixel
//! pipeline can keep up. The [`Debouncer`] coalesces them into one
//! release per quiet period, and the [`RenderScheduler`] runs at most
//! one job per eye at a time on a worker thread, superseding any
//! queued or in-flight job when a newer one for the same eye arrives.
//! Histograms are computed by the worker on the finished output, so a
//! histogram delivered with a frame always describes that frame.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use irismap_core::{apply_adjustments, compute_histogram, Adjustments, Histogram, PixelBuffer};
use thiserror::Error;
use tracing::debug;

use crate::session::Eye;

/// Default quiet window between the last parameter change and the
/// render it releases.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Errors from scheduler plumbing.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker thread has shut down
    #[error("Render worker has shut down")]
    WorkerGone,

    /// The result channel lock was poisoned
    #[error("Scheduler result lock poisoned")]
    Poisoned,
}

/// Per-eye quiet-window tracker.
///
/// Time is passed in explicitly so tests control the clock.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: [Option<Instant>; 2],
}

impl Debouncer {
    /// Create a debouncer with the default quiet window.
    pub fn new() -> Self {
        Self::with_window(DEBOUNCE_WINDOW)
    }

    /// Create a debouncer with a custom quiet window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            pending: [None, None],
        }
    }

    /// Record a parameter change for one eye at time `now`. Restarts
    /// that eye's quiet window.
    pub fn mark_changed(&mut self, eye: Eye, now: Instant) {
        self.pending[eye.index()] = Some(now);
    }

    /// Drop any pending release for one eye.
    pub fn cancel(&mut self, eye: Eye) {
        self.pending[eye.index()] = None;
    }

    /// True while a change awaits its quiet window.
    pub fn is_pending(&self, eye: Eye) -> bool {
        self.pending[eye.index()].is_some()
    }

    /// Take every eye whose quiet window has elapsed at time `now`.
    pub fn poll_due(&mut self, now: Instant) -> Vec<Eye> {
        let mut due = Vec::new();
        for eye in Eye::BOTH {
            if let Some(changed_at) = self.pending[eye.index()] {
                if now.duration_since(changed_at) >= self.window {
                    self.pending[eye.index()] = None;
                    due.push(eye);
                }
            }
        }
        due
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

struct ScheduledJob {
    eye: Eye,
    generation: u64,
    sequence: u64,
    source: PixelBuffer,
    adjustments: Adjustments,
}

/// A finished render, tagged with everything needed for the stale
/// checks on the receiving side.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub eye: Eye,
    /// Image generation the job was submitted against.
    pub generation: u64,
    pub sequence: u64,
    pub buffer: PixelBuffer,
    /// Histogram of `buffer`, computed by the worker.
    pub histogram: Histogram,
    pub render_time_ms: u64,
}

/// Background pipeline running the adjustment stack off the UI thread.
///
/// Submissions carry a monotonic sequence; the per-eye latest sequence
/// is published so the worker can drop superseded jobs both before
/// starting and before delivering.
pub struct RenderScheduler {
    next_sequence: AtomicU64,
    latest_sequence: Arc<[AtomicU64; 2]>,
    submit_tx: mpsc::Sender<ScheduledJob>,
    result_rx: Mutex<mpsc::Receiver<RenderOutput>>,
}

impl RenderScheduler {
    /// Create the scheduler and start its worker thread.
    pub fn new() -> Self {
        let (submit_tx, submit_rx) = mpsc::channel::<ScheduledJob>();
        let (result_tx, result_rx) = mpsc::channel::<RenderOutput>();
        let latest_sequence: Arc<[AtomicU64; 2]> =
            Arc::new([AtomicU64::new(0), AtomicU64::new(0)]);

        spawn_worker(submit_rx, result_tx, Arc::clone(&latest_sequence));

        Self {
            next_sequence: AtomicU64::new(0),
            latest_sequence,
            submit_tx,
            result_rx: Mutex::new(result_rx),
        }
    }

    /// Queue a render of `source` with `adjustments`, superseding any
    /// earlier job for the same eye.
    ///
    /// # Returns
    /// The job's sequence number.
    pub fn submit(
        &self,
        eye: Eye,
        generation: u64,
        source: PixelBuffer,
        adjustments: Adjustments,
    ) -> Result<u64, SchedulerError> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_sequence[eye.index()].store(sequence, Ordering::SeqCst);
        self.submit_tx
            .send(ScheduledJob {
                eye,
                generation,
                sequence,
                source,
                adjustments,
            })
            .map_err(|_| SchedulerError::WorkerGone)?;
        Ok(sequence)
    }

    /// Invalidate every queued or in-flight job for one eye, without
    /// submitting a replacement. Used when switching eyes or loading a
    /// new image.
    pub fn invalidate(&self, eye: Eye) {
        let fence = self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest_sequence[eye.index()].store(fence, Ordering::SeqCst);
        debug!(eye = ?eye, fence, "Invalidated pending renders");
    }

    /// Drain finished renders, keeping only the newest per eye.
    pub fn try_receive(&self) -> Result<Vec<RenderOutput>, SchedulerError> {
        let receiver = self.result_rx.lock().map_err(|_| SchedulerError::Poisoned)?;

        let mut newest: [Option<RenderOutput>; 2] = [None, None];
        loop {
            match receiver.try_recv() {
                Ok(output) => {
                    let slot = &mut newest[output.eye.index()];
                    let replace = slot
                        .as_ref()
                        .map(|held| output.sequence > held.sequence)
                        .unwrap_or(true);
                    if replace {
                        *slot = Some(output);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    if newest.iter().all(Option::is_none) {
                        return Err(SchedulerError::WorkerGone);
                    }
                    break;
                }
            }
        }

        Ok(newest.into_iter().flatten().collect())
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_worker(
    submit_rx: mpsc::Receiver<ScheduledJob>,
    result_tx: mpsc::Sender<RenderOutput>,
    latest_sequence: Arc<[AtomicU64; 2]>,
) {
    thread::spawn(move || {
        while let Ok(first) = submit_rx.recv() {
            // Coalesce the backlog down to the newest job per eye.
            let mut newest: [Option<ScheduledJob>; 2] = [None, None];
            stash_newest(&mut newest, first);
            while let Ok(next) = submit_rx.try_recv() {
                stash_newest(&mut newest, next);
            }

            for job in newest.into_iter().flatten() {
                let slot = job.eye.index();
                if job.sequence < latest_sequence[slot].load(Ordering::SeqCst) {
                    debug!(eye = ?job.eye, sequence = job.sequence, "Skipping superseded job");
                    continue;
                }

                let started = Instant::now();
                let buffer = apply_adjustments(&job.source, &job.adjustments);
                let histogram = compute_histogram(&buffer);
                let elapsed = started.elapsed().as_millis() as u64;

                // Superseded while rendering: the result is already stale.
                if job.sequence < latest_sequence[slot].load(Ordering::SeqCst) {
                    debug!(eye = ?job.eye, sequence = job.sequence, "Discarding stale render");
                    continue;
                }

                debug!(
                    eye = ?job.eye,
                    sequence = job.sequence,
                    render_time_ms = elapsed,
                    "Render complete"
                );
                let output = RenderOutput {
                    eye: job.eye,
                    generation: job.generation,
                    sequence: job.sequence,
                    buffer,
                    histogram,
                    render_time_ms: elapsed,
                };
                if result_tx.send(output).is_err() {
                    return;
                }
            }
        }
    });
}

fn stash_newest(newest: &mut [Option<ScheduledJob>; 2], job: ScheduledJob) {
    let slot = &mut newest[job.eye.index()];
    let replace = slot
        .as_ref()
        .map(|held| job.sequence > held.sequence)
        .unwrap_or(true);
    if replace {
        *slot = Some(job);
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
