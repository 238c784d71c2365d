//! Transcribe step - speech to text for one video.
//!
//! The transcript and the scratch audio extracted next to it are copied into
//! `{video_run_dir}/transcribe/`. When both copies exist, the transcript's
//! `audio_path` is pointed at the copied audio.

use std::path::Path;

use serde_json::Value;

use crate::models::JobStep;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{path_value, StepContext, StepOutcome};
use crate::stages::TranscribeRequest;
use crate::workspace::rewrite_transcript_audio_path;

use super::{copy_into_dir, field_map};

/// Transcription through the injected `Transcriber`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscribeStep;

impl PipelineStep for TranscribeStep {
    fn step(&self) -> JobStep {
        JobStep::Transcribe
    }

    fn start_message(&self) -> &str {
        "Starting transcription"
    }

    fn description(&self) -> &str {
        "Transcribe audio"
    }

    fn validate_input(&self, ctx: &StepContext<'_>) -> StepResult<()> {
        ctx.video_path().map(|_| ())
    }

    fn execute(&self, ctx: &StepContext<'_>) -> StepResult<StepOutcome> {
        let video_path = ctx.video_path()?;
        let settings = &ctx.settings.transcribe;
        let transcribe_dir = ctx.step_dir(JobStep::Transcribe);
        let audio_src = ctx.workspace.scratch_audio_path(&video_path);

        if ctx.store.is_transcribed(ctx.video_id) && settings.skip_done {
            let state = ctx.video_state();

            let copied_transcript = state
                .transcript_path
                .as_deref()
                .and_then(|src| copy_into_dir(ctx, "transcript", src, &transcribe_dir));
            if let Some(path) = &copied_transcript {
                ctx.update_job_status(field_map([("transcript_path", path_value(path))]))?;
            }

            let copied_audio = copy_into_dir(ctx, "audio", &audio_src, &transcribe_dir);
            if let Some(path) = &copied_audio {
                ctx.update_job_status(field_map([("transcript_audio_path", path_value(path))]))?;
            }

            if let (Some(transcript), Some(audio)) = (&copied_transcript, &copied_audio) {
                rewrite_audio_path(transcript, audio)?;
            }

            ctx.info("Already transcribed; skipping");
            return Ok(StepOutcome::Skipped("already transcribed".to_string()));
        }

        let request = TranscribeRequest {
            video_id: ctx.video_id,
            video_path: &video_path,
            audio_dir: ctx.workspace.temp_dir(),
            settings,
        };
        let transcript_src = ctx
            .collaborators
            .transcriber
            .transcribe(&request)
            .map_err(StepError::from_collaborator)?
            .ok_or_else(|| StepError::collaborator("Transcription failed (no transcript returned)"))?;

        let copied_transcript = copy_into_dir(ctx, "transcript", &transcript_src, &transcribe_dir);
        let copied_audio = copy_into_dir(ctx, "audio", &audio_src, &transcribe_dir);
        if let (Some(transcript), Some(audio)) = (&copied_transcript, &copied_audio) {
            rewrite_audio_path(transcript, audio)?;
        }

        let transcript_path = copied_transcript.unwrap_or(transcript_src);
        ctx.store
            .mark_transcribed(ctx.video_id, &transcript_path, copied_audio.as_deref())?;

        let mut updates = field_map([
            ("transcribed", Value::Bool(true)),
            ("transcript_path", path_value(&transcript_path)),
        ]);
        if let Some(audio) = &copied_audio {
            updates.insert("transcript_audio_path".to_string(), path_value(audio));
        }
        ctx.update_job_status(updates.clone())?;
        ctx.emit_state(updates);
        ctx.info("Transcription complete");

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &StepContext<'_>) -> StepResult<()> {
        if !ctx.store.is_transcribed(ctx.video_id) {
            return Err(StepError::precondition_failed(
                "Transcript was not recorded in the state store",
            ));
        }
        Ok(())
    }
}

fn rewrite_audio_path(transcript: &Path, audio: &Path) -> StepResult<()> {
    rewrite_transcript_audio_path(transcript, audio)
        .map(|_| ())
        .map_err(|e| StepError::io_error("rewriting transcript audio path", e))
}
