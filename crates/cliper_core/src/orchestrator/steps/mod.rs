//! Pipeline step implementations.
//!
//! Each step is a unit struct implementing `PipelineStep`; all state lives
//! in the store and the step context.

mod clips;
mod export;
mod transcribe;

pub use clips::GenerateClipsStep;
pub use export::ExportClipsStep;
pub use transcribe::TranscribeStep;

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::events::FieldMap;
use crate::models::JobStep;
use crate::workspace::copy_if_exists;

use super::errors::ConfigError;
use super::step::PipelineStep;
use super::types::StepContext;

/// Step implementation for a job step.
pub fn step_for(step: JobStep) -> Result<Box<dyn PipelineStep>, ConfigError> {
    match step {
        JobStep::Transcribe => Ok(Box::new(TranscribeStep)),
        JobStep::GenerateClips => Ok(Box::new(GenerateClipsStep)),
        JobStep::ExportClips => Ok(Box::new(ExportClipsStep)),
        JobStep::Download => Err(ConfigError::UnsupportedStep(step)),
    }
}

/// Build the ordered step list for a job.
pub fn build_pipeline(steps: &[JobStep]) -> Result<Vec<Box<dyn PipelineStep>>, ConfigError> {
    steps.iter().map(|s| step_for(*s)).collect()
}

/// Copy `src` into `dir` keeping its file name.
fn copy_into_dir(ctx: &StepContext<'_>, what: &str, src: &Path, dir: &Path) -> Option<PathBuf> {
    let name = src.file_name()?;
    ctx.copied(what, copy_if_exists(src, &dir.join(name)))
}

fn field_map<const N: usize>(pairs: [(&str, Value); N]) -> FieldMap {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_steps_in_order() {
        let pipeline = build_pipeline(&[JobStep::Transcribe, JobStep::ExportClips]).unwrap();
        let names: Vec<&str> = pipeline.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["transcribe", "export_clips"]);
    }

    #[test]
    fn download_has_no_step() {
        assert!(matches!(
            step_for(JobStep::Download),
            Err(ConfigError::UnsupportedStep(JobStep::Download))
        ));
    }
}
