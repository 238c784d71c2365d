//! Data models for the clip pipeline engine.
//!
//! - Enums for pipeline steps and job lifecycle
//! - Per-video durable records and clip descriptors
//! - Job specifications, typed settings and status

mod enums;
mod jobs;
mod settings;
mod video;

pub use enums::{JobState, JobStep};
pub use jobs::{JobSpec, JobStatus};
pub use settings::{ClipSettings, ExportSettings, JobSettings, LogoPosition, TranscribeSettings};
pub use video::{ClipDescriptor, VideoRecord};
