//! Contracts for the external pipeline stages.
//!
//! Speech recognition, clip selection and rendering live outside this
//! crate. The runner talks to them only through these traits, so front
//! ends inject real engines and tests inject stubs.
//!
//! Collaborator errors are `anyhow::Error`; their message is surfaced
//! verbatim as the job's failure reason.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::Serialize;

use crate::events::FieldMap;
use crate::models::{ClipDescriptor, ClipSettings, ExportSettings, TranscribeSettings};

/// Input for a transcription.
#[derive(Debug, Clone, Copy)]
pub struct TranscribeRequest<'a> {
    pub video_id: &'a str,
    pub video_path: &'a Path,
    /// Directory where extracted audio is expected (`{stem}_audio.wav`).
    pub audio_dir: &'a Path,
    pub settings: &'a TranscribeSettings,
}

/// Input for clip generation.
#[derive(Debug, Clone, Copy)]
pub struct ClipRequest<'a> {
    pub video_id: &'a str,
    pub transcript_path: &'a Path,
    pub settings: &'a ClipSettings,
}

/// Input for rendering clips.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub video_id: &'a str,
    pub video_path: &'a Path,
    pub clips: &'a [ClipDescriptor],
    /// Directory the exporter writes into.
    pub output_dir: &'a Path,
    /// Name of the subdirectory the exporter creates under `output_dir`.
    pub video_name: &'a str,
    pub transcript_path: Option<&'a Path>,
    pub clip_styles: Option<&'a FieldMap>,
    pub settings: &'a ExportSettings,
}

/// Speech-to-text engine.
pub trait Transcriber: Send + Sync {
    /// Transcribe a video. `Ok(None)` means the engine produced nothing.
    fn transcribe(&self, request: &TranscribeRequest<'_>) -> Result<Option<PathBuf>>;
}

/// Highlight selection engine.
pub trait ClipGenerator: Send + Sync {
    fn generate_clips(&self, request: &ClipRequest<'_>) -> Result<Vec<ClipDescriptor>>;

    /// Persist clip metadata at `dest` and return the written path.
    fn save_clips_metadata(
        &self,
        clips: &[ClipDescriptor],
        video_id: &str,
        dest: &Path,
    ) -> Result<PathBuf> {
        JsonClipMetadataWriter.write(clips, video_id, dest)
    }
}

/// Rendering engine.
pub trait VideoExporter: Send + Sync {
    /// Render clips; returns the produced artifact paths in order.
    fn export_clips(&self, request: &ExportRequest<'_>) -> Result<Vec<PathBuf>>;
}

/// The engines a runner delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub clip_generator: Arc<dyn ClipGenerator>,
    pub exporter: Arc<dyn VideoExporter>,
}

impl Collaborators {
    pub fn new(
        transcriber: impl Transcriber + 'static,
        clip_generator: impl ClipGenerator + 'static,
        exporter: impl VideoExporter + 'static,
    ) -> Self {
        Self {
            transcriber: Arc::new(transcriber),
            clip_generator: Arc::new(clip_generator),
            exporter: Arc::new(exporter),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ClipsMetadata<'a> {
    video_id: &'a str,
    num_clips: usize,
    clips: &'a [ClipDescriptor],
}

/// Writes clip metadata as pretty JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonClipMetadataWriter;

impl JsonClipMetadataWriter {
    pub fn write(&self, clips: &[ClipDescriptor], video_id: &str, dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let metadata = ClipsMetadata {
            video_id,
            num_clips: clips.len(),
            clips,
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        fs::write(dest, json).with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(dest.to_path_buf())
    }
}
