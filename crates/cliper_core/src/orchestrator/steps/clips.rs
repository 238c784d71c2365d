//! Generate-clips step - picks highlight segments from the transcript.

use serde_json::Value;

use crate::models::JobStep;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{path_value, StepContext, StepOutcome};
use crate::stages::ClipRequest;

use super::{copy_into_dir, field_map};

const NEEDS_TRANSCRIPT: &str = "No transcript_path found; run Transcribe first";

/// Clip selection through the injected `ClipGenerator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateClipsStep;

impl PipelineStep for GenerateClipsStep {
    fn step(&self) -> JobStep {
        JobStep::GenerateClips
    }

    fn start_message(&self) -> &str {
        "Generating clips"
    }

    fn description(&self) -> &str {
        "Generate clips"
    }

    fn validate_input(&self, ctx: &StepContext<'_>) -> StepResult<()> {
        if ctx.video_state().transcript_path.is_none() {
            return Err(StepError::precondition_failed(NEEDS_TRANSCRIPT));
        }
        Ok(())
    }

    fn execute(&self, ctx: &StepContext<'_>) -> StepResult<StepOutcome> {
        let state = ctx.video_state();
        let settings = &ctx.settings.clips;
        let clips_dir = ctx.step_dir(JobStep::GenerateClips);
        let transcript_path = state
            .transcript_path
            .as_deref()
            .ok_or_else(|| StepError::precondition_failed(NEEDS_TRANSCRIPT))?;

        if (state.clips_generated || state.clips_metadata_path.is_some()) && settings.skip_done {
            let copied = state
                .clips_metadata_path
                .as_deref()
                .and_then(|src| copy_into_dir(ctx, "clips metadata", src, &clips_dir));
            if let Some(path) = &copied {
                ctx.update_job_status(field_map([("clips_metadata_path", path_value(path))]))?;
            }
            ctx.info("Clips already generated; skipping");
            return Ok(StepOutcome::Skipped("clips already generated".to_string()));
        }

        let generator = &ctx.collaborators.clip_generator;
        let clips = generator
            .generate_clips(&ClipRequest {
                video_id: ctx.video_id,
                transcript_path,
                settings,
            })
            .map_err(StepError::from_collaborator)?;
        if clips.is_empty() {
            return Err(StepError::collaborator(
                "Clips generation failed (no clips returned)",
            ));
        }

        let dest = clips_dir.join(format!("{}_clips.json", ctx.video_id));
        let metadata_path = generator
            .save_clips_metadata(&clips, ctx.video_id, &dest)
            .map_err(StepError::from_collaborator)?;

        ctx.store
            .mark_clips_generated(ctx.video_id, &clips, &metadata_path)?;
        ctx.update_job_status(field_map([(
            "clips_metadata_path",
            path_value(&metadata_path),
        )]))?;
        ctx.emit_state(field_map([
            ("clips_generated", Value::Bool(true)),
            ("clips_count", Value::from(clips.len())),
            ("clips_metadata_path", path_value(&metadata_path)),
        ]));
        ctx.info("Clips generation complete");

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &StepContext<'_>) -> StepResult<()> {
        if !ctx.video_state().clips_generated {
            return Err(StepError::precondition_failed(
                "Clips were not recorded in the state store",
            ));
        }
        Ok(())
    }
}
