//! Durable per-video state.
//!
//! The job runner only depends on the `StateStore` trait. `JsonStateStore`
//! is the bundled implementation: one JSON document on disk, rewritten
//! atomically after every mutation.

mod json;

pub use json::JsonStateStore;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::events::FieldMap;
use crate::models::{ClipDescriptor, VideoRecord};

/// Errors raised by state store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value persistence of pipeline progress, keyed by video id.
///
/// Every mutation is an atomic upsert and safe to repeat with identical
/// arguments. Implementations serialize concurrent writes.
pub trait StateStore: Send + Sync {
    /// Create or refresh a video's identity fields; progress is kept.
    fn register_video(
        &self,
        video_id: &str,
        filename: &str,
        video_path: Option<&Path>,
        content_type: Option<&str>,
    ) -> StoreResult<()>;

    fn get_video_path(&self, video_id: &str) -> Option<PathBuf>;

    fn get_video_state(&self, video_id: &str) -> Option<VideoRecord>;

    /// All registered videos, ordered by id.
    fn get_all_videos(&self) -> Vec<VideoRecord>;

    fn mark_transcribed(
        &self,
        video_id: &str,
        transcript_path: &Path,
        audio_path: Option<&Path>,
    ) -> StoreResult<()>;

    fn mark_clips_generated(
        &self,
        video_id: &str,
        clips: &[ClipDescriptor],
        clips_metadata_path: &Path,
    ) -> StoreResult<()>;

    fn mark_clips_exported(
        &self,
        video_id: &str,
        exported_paths: &[PathBuf],
        aspect_ratio: Option<&str>,
    ) -> StoreResult<()>;

    /// Merge job-scoped fields (run directory, final output, ...).
    fn update_job_status(&self, job_id: &str, fields: FieldMap) -> StoreResult<()>;

    fn get_job_status(&self, job_id: &str) -> Option<FieldMap>;

    /// Forget everything about a video. Returns whether it existed.
    fn clear_video_state(&self, video_id: &str) -> StoreResult<bool>;

    fn is_transcribed(&self, video_id: &str) -> bool {
        self.get_video_state(video_id)
            .map(|v| v.transcribed)
            .unwrap_or(false)
    }
}
