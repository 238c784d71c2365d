//! Export step - renders clips and records the final output.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;

use crate::models::JobStep;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{path_value, StepContext, StepOutcome};
use crate::stages::ExportRequest;
use crate::workspace::copy_exported_clip;

use super::field_map;

/// Subdirectory name the exporter creates inside the video run directory.
const EXPORT_VIDEO_NAME: &str = "export";

/// Rendering through the injected `VideoExporter`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportClipsStep;

impl PipelineStep for ExportClipsStep {
    fn step(&self) -> JobStep {
        JobStep::ExportClips
    }

    fn start_message(&self) -> &str {
        "Exporting clips"
    }

    fn description(&self) -> &str {
        "Export clips"
    }

    fn validate_input(&self, ctx: &StepContext<'_>) -> StepResult<()> {
        if ctx.video_state().clips.is_empty() {
            return Err(StepError::precondition_failed(
                "No clips in state; run Generate Clips first",
            ));
        }
        Ok(())
    }

    fn execute(&self, ctx: &StepContext<'_>) -> StepResult<StepOutcome> {
        let state = ctx.video_state();
        let settings = &ctx.settings.export;

        if state.clips_exported && settings.skip_done {
            let existing: Vec<&PathBuf> = state
                .exported_clips
                .iter()
                .filter(|p| !p.as_os_str().is_empty())
                .collect();

            let copied: Vec<PathBuf> = existing
                .iter()
                .filter_map(|src| {
                    ctx.copied("exported clip", copy_exported_clip(src, ctx.video_run_dir))
                })
                .collect();

            let copied_mp4s: Vec<&Path> = existing_mp4s(copied.iter().map(PathBuf::as_path));
            let finals = if copied_mp4s.is_empty() {
                existing_mp4s(existing.iter().map(|p| p.as_path()))
            } else {
                copied_mp4s.clone()
            };

            if let Some(newest) = newest_by_mtime(&finals) {
                ctx.update_job_status(final_video_fields(newest, &finals))?;
            }

            ctx.emit_state(field_map([
                ("clips_exported", Value::Bool(true)),
                ("exported_count", Value::from(copied_mp4s.len())),
            ]));
            ctx.info("Clips already exported; skipping");
            return Ok(StepOutcome::Skipped("clips already exported".to_string()));
        }

        let video_path = ctx.video_path()?;
        let request = ExportRequest {
            video_id: ctx.video_id,
            video_path: &video_path,
            clips: &state.clips,
            output_dir: ctx.video_run_dir,
            video_name: EXPORT_VIDEO_NAME,
            transcript_path: state.transcript_path.as_deref(),
            clip_styles: state.clip_styles.as_ref(),
            settings,
        };
        let exported = ctx
            .collaborators
            .exporter
            .export_clips(&request)
            .map_err(StepError::from_collaborator)?;

        ctx.store.mark_clips_exported(
            ctx.video_id,
            &exported,
            settings.aspect_ratio.as_deref(),
        )?;

        if let Some(last) = exported.last() {
            let all: Vec<&Path> = exported.iter().map(PathBuf::as_path).collect();
            ctx.update_job_status(final_video_fields(last, &all))?;
        }

        ctx.emit_state(field_map([
            ("clips_exported", Value::Bool(!exported.is_empty())),
            ("exported_count", Value::from(exported.len())),
        ]));
        ctx.info("Export complete");

        Ok(StepOutcome::Success)
    }
}

fn is_mp4(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}

fn existing_mp4s<'a>(paths: impl Iterator<Item = &'a Path>) -> Vec<&'a Path> {
    paths.filter(|p| is_mp4(p) && p.is_file()).collect()
}

/// Most recently modified file; the first one wins a tie.
fn newest_by_mtime<'a>(paths: &[&'a Path]) -> Option<&'a Path> {
    let mut newest: Option<(&Path, SystemTime)> = None;
    for &path in paths {
        let mtime = fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        match newest {
            Some((_, best)) if mtime <= best => {}
            _ => newest = Some((path, mtime)),
        }
    }
    newest.map(|(path, _)| path)
}

fn final_video_fields(final_path: &Path, all: &[&Path]) -> crate::events::FieldMap {
    field_map([
        ("final_video_path", path_value(final_path)),
        (
            "final_video_paths",
            Value::Array(all.iter().map(|p| path_value(p)).collect()),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn newest_picks_latest_mtime() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.mp4");
        let new = dir.path().join("new.mp4");
        fs::write(&old, "a").unwrap();
        fs::write(&new, "b").unwrap();
        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(now - Duration::from_secs(120))
            .unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(now - Duration::from_secs(10))
            .unwrap();

        let paths = [new.as_path(), old.as_path()];
        assert_eq!(newest_by_mtime(&paths), Some(new.as_path()));
        assert_eq!(newest_by_mtime(&[]), None);
    }

    #[test]
    fn only_existing_mp4s_count() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.MP4");
        let srt = dir.path().join("clip.srt");
        fs::write(&clip, "v").unwrap();
        fs::write(&srt, "s").unwrap();
        let missing = dir.path().join("gone.mp4");

        let found = existing_mp4s([clip.as_path(), srt.as_path(), missing.as_path()].into_iter());
        assert_eq!(found, vec![clip.as_path()]);
    }
}
