//! Job orchestration.
//!
//! A job runs every step for the first video, then every step for the
//! next. Before doing work, each step asks the state store whether it has
//! already been done and, if so, only copies the earlier artifacts into
//! the new run directory.
//!
//! # Architecture
//!
//! ```text
//! JobRunner
//!     ├── RunWorkspace   {runs_root}/{slug}_{job_id}/{video_id}/...
//!     ├── StateStore     skip decisions, durable progress
//!     ├── Collaborators  transcriber, clip generator, exporter
//!     ├── EventSink      JobStatus / Progress / Log / State events
//!     └── Steps
//!         ├── transcribe
//!         ├── generate_clips
//!         └── export_clips
//! ```

mod errors;
mod runner;
mod step;
pub mod steps;
mod types;

pub use errors::{ConfigError, StepError, StepResult};
pub use runner::JobRunner;
pub use step::PipelineStep;
pub use steps::{ExportClipsStep, GenerateClipsStep, TranscribeStep};
pub use types::{Emitter, StepContext, StepOutcome};
