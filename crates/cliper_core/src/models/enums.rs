//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// A pipeline stage that can be named in a job.
///
/// `Download` exists so that front ends can name it, but it is not a job
/// step: downloading registers a new video rather than advancing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStep {
    Download,
    Transcribe,
    GenerateClips,
    ExportClips,
}

impl JobStep {
    /// Wire name of the step (as used in job specs and progress labels).
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStep::Download => "download",
            JobStep::Transcribe => "transcribe",
            JobStep::GenerateClips => "generate_clips",
            JobStep::ExportClips => "export_clips",
        }
    }

    /// Name of the run-workspace subdirectory holding this step's artifacts.
    pub fn workspace_dir(&self) -> &'static str {
        match self {
            JobStep::Download => "download",
            JobStep::Transcribe => "transcribe",
            JobStep::GenerateClips => "clips",
            JobStep::ExportClips => "export",
        }
    }

    /// Whether this step may appear in a submitted job.
    pub fn is_job_step(&self) -> bool {
        !matches!(self, JobStep::Download)
    }
}

impl std::fmt::Display for JobStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Canceled
        )
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (JobState::Pending, JobState::Running) => true,
            (JobState::Pending, JobState::Canceled) => true,
            (JobState::Running, s) => s.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_serializes_snake_case() {
        let json = serde_json::to_string(&JobStep::GenerateClips).unwrap();
        assert_eq!(json, "\"generate_clips\"");
        let parsed: JobStep = serde_json::from_str("\"export_clips\"").unwrap();
        assert_eq!(parsed, JobStep::ExportClips);
    }

    #[test]
    fn download_is_not_a_job_step() {
        assert!(!JobStep::Download.is_job_step());
        assert!(JobStep::Transcribe.is_job_step());
    }

    #[test]
    fn state_transitions_are_forward_only() {
        assert!(JobState::Pending.can_transition_to(JobState::Running));
        assert!(JobState::Running.can_transition_to(JobState::Failed));
        assert!(!JobState::Succeeded.can_transition_to(JobState::Running));
        assert!(!JobState::Running.can_transition_to(JobState::Pending));
        assert!(!JobState::Failed.can_transition_to(JobState::Succeeded));
    }
}
