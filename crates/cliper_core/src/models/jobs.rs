//! Job-related data structures (specs and status).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::enums::{JobState, JobStep};
use super::settings::JobSettings;
use crate::orchestrator::ConfigError;

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A unit of work: which videos, which steps, and how.
///
/// Steps run video-major: every step of the first video, then every step
/// of the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    job_id: String,
    #[serde(default)]
    video_ids: Vec<String>,
    #[serde(default)]
    steps: Vec<JobStep>,
    #[serde(default)]
    settings: JobSettings,
}

impl JobSpec {
    /// Create a job with default settings.
    pub fn new(
        job_id: impl Into<String>,
        video_ids: impl IntoIterator<Item = impl Into<String>>,
        steps: impl IntoIterator<Item = JobStep>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            video_ids: video_ids.into_iter().map(Into::into).collect(),
            steps: steps.into_iter().collect(),
            settings: JobSettings::default(),
        }
    }

    /// Replace the settings (builder pattern).
    pub fn with_settings(mut self, settings: JobSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Generate a job id unique within this process and across restarts.
    pub fn new_job_id() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = JOB_COUNTER.fetch_add(1, Ordering::Relaxed) % 10_000;
        format!("{}_{:04}", millis, seq)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn video_ids(&self) -> &[String] {
        &self.video_ids
    }

    pub fn steps(&self) -> &[JobStep] {
        &self.steps
    }

    pub fn settings(&self) -> &JobSettings {
        &self.settings
    }

    /// Total number of progress ticks for this job.
    pub fn progress_total(&self) -> u64 {
        self.video_ids.len() as u64 * self.steps.len().max(1) as u64
    }

    /// Check the job can be executed.
    ///
    /// Rejects steps that are not pipeline stages, ids that cannot be used
    /// as a single directory name, and invalid settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_path_safe_id("job_id", &self.job_id)?;
        for video_id in &self.video_ids {
            check_path_safe_id("video_ids", video_id)?;
        }
        if let Some(step) = self.steps.iter().find(|s| !s.is_job_step()) {
            return Err(ConfigError::UnsupportedStep(*step));
        }
        self.settings.validate()
    }
}

/// Mutable status of a running job; owned by the runner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    state: JobState,
    progress_current: u64,
    progress_total: u64,
    #[serde(default)]
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl JobStatus {
    /// A pending status with a fixed total.
    pub fn new(progress_total: u64) -> Self {
        Self {
            progress_total,
            ..Default::default()
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress_current(&self) -> u64 {
        self.progress_current
    }

    pub fn progress_total(&self) -> u64 {
        self.progress_total
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn started_at(&self) -> Option<&str> {
        self.started_at.as_deref()
    }

    pub fn finished_at(&self) -> Option<&str> {
        self.finished_at.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Count one completed step. Never exceeds the total.
    pub fn advance(&mut self) {
        if self.progress_current < self.progress_total {
            self.progress_current += 1;
        }
    }

    pub fn mark_started(&mut self) {
        if self.transition(JobState::Running) {
            self.started_at = Some(now());
        }
    }

    pub fn mark_succeeded(&mut self) {
        if self.transition(JobState::Succeeded) {
            self.finished_at = Some(now());
        }
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        if self.transition(JobState::Failed) {
            self.error = Some(error.into());
            self.finished_at = Some(now());
        }
    }

    fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "Ignoring job state transition {} -> {}",
                self.state,
                next
            );
            return false;
        }
        self.state = next;
        true
    }
}

/// Ids become directory names inside the run workspace.
fn check_path_safe_id(field: &str, id: &str) -> Result<(), ConfigError> {
    if id.trim().is_empty() {
        return Err(ConfigError::invalid_setting(field, "id is empty"));
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(ConfigError::invalid_setting(
            field,
            format!("'{}' is not a valid directory name", id),
        ));
    }
    Ok(())
}

fn now() -> String {
    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}
