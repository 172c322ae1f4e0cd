//! Irismap Session - editing sessions over the core pipeline
//!
//! This crate coordinates the interactive side of Irismap: per-eye
//! editing sessions, command routing between the control surface and
//! the two eyes, the debounced background render scheduler, grid
//! retrieval, and export flattening. All pixel math lives in
//! `irismap-core`; this crate decides when it runs and where the
//! results go.

pub mod export;
pub mod grids;
pub mod scheduler;
pub mod session;

pub use export::{
    export_png, flatten_eye, ExportError, ExportOutput, GridRasterizer, RasterizeError,
};
pub use grids::{DirGridSource, GridError, GridSource};
pub use scheduler::{Debouncer, RenderOutput, RenderScheduler, SchedulerError, DEBOUNCE_WINDOW};
pub use session::{Eye, EyeSession, Mapper, SessionError};
