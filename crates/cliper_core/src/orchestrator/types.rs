//! Core types shared by the runner and its steps.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::events::{Event, EventSink, FieldMap};
use crate::logging::{JobLogger, LogLevel};
use crate::models::{JobSettings, JobStep, VideoRecord};
use crate::stages::Collaborators;
use crate::store::StateStore;
use crate::workspace::{CopyOutcome, RunWorkspace};

use super::errors::{StepError, StepResult};

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step did its work.
    Success,
    /// Step found its work already done.
    Skipped(String),
}

/// Delivers events to the sink and mirrors them into the job log.
pub struct Emitter {
    job_id: String,
    sink: Arc<dyn EventSink>,
    logger: JobLogger,
}

impl Emitter {
    pub fn new(job_id: impl Into<String>, sink: Arc<dyn EventSink>, logger: JobLogger) -> Self {
        Self {
            job_id: job_id.into(),
            sink,
            logger,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    /// Replace the job logger (once the run directory exists).
    pub fn set_logger(&mut self, logger: JobLogger) {
        self.logger.close();
        self.logger = logger;
    }

    pub fn emit(&self, event: Event) {
        self.logger.record(&event);
        self.sink.emit(event);
    }

    pub fn log(&self, video_id: Option<&str>, level: LogLevel, message: impl Into<String>) {
        self.emit(Event::log(&self.job_id, video_id, level, message));
    }
}

/// Everything a step needs while working on one video.
pub struct StepContext<'a> {
    pub job_id: &'a str,
    pub video_id: &'a str,
    /// `{runs_root}/{run_name}`.
    pub run_dir: &'a Path,
    /// `{run_dir}/{video_id}`.
    pub video_run_dir: &'a Path,
    pub settings: &'a JobSettings,
    pub store: &'a dyn StateStore,
    pub collaborators: &'a Collaborators,
    pub workspace: &'a RunWorkspace,
    pub events: &'a Emitter,
}

impl StepContext<'_> {
    pub fn info(&self, message: impl Into<String>) {
        self.events.log(Some(self.video_id), LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.events.log(Some(self.video_id), LogLevel::Warn, message);
    }

    /// Artifact directory for `step` inside the video's run directory.
    pub fn step_dir(&self, step: JobStep) -> PathBuf {
        self.video_run_dir.join(step.workspace_dir())
    }

    /// Registered source file of the current video.
    pub fn video_path(&self) -> StepResult<PathBuf> {
        self.store
            .get_video_path(self.video_id)
            .ok_or_else(|| StepError::video_not_registered(self.video_id))
    }

    /// Stored record of the current video, or an empty one.
    pub fn video_state(&self) -> VideoRecord {
        self.store
            .get_video_state(self.video_id)
            .unwrap_or_else(|| VideoRecord::new(self.video_id, ""))
    }

    /// Unwrap a copy outcome, reporting failed copies as warnings.
    pub fn copied(&self, what: &str, outcome: CopyOutcome) -> Option<PathBuf> {
        match outcome {
            CopyOutcome::Copied(path) => Some(path),
            CopyOutcome::SourceAbsent => None,
            CopyOutcome::Failed(e) => {
                self.warn(format!("Could not copy {} into run directory: {}", what, e));
                None
            }
        }
    }

    pub fn update_job_status(&self, fields: FieldMap) -> StepResult<()> {
        self.store.update_job_status(self.job_id, fields)?;
        Ok(())
    }

    pub fn emit_state(&self, updates: FieldMap) {
        self.events
            .emit(Event::state(self.job_id, self.video_id, updates));
    }
}

/// String form of a path as stored in job status fields.
pub(crate) fn path_value(path: &Path) -> Value {
    Value::String(path.display().to_string())
}
