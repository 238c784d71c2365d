//! Event payloads.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::models::JobState;

/// Field map carried by state events and job-status side-channel updates.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// A job changed lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusEvent {
    pub job_id: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Progress counter tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub current: u64,
    pub total: u64,
    pub label: String,
}

/// A human-readable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    pub level: LogLevel,
    pub message: String,
}

/// Durable per-video fields changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    pub job_id: String,
    pub video_id: String,
    pub updates: FieldMap,
}

/// Closed set of notifications emitted by the job runner.
///
/// Events are snapshots taken at emission time and own all their data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    JobStatus(JobStatusEvent),
    Progress(ProgressEvent),
    Log(LogEvent),
    State(StateEvent),
}

impl Event {
    pub fn job_status(job_id: &str, state: JobState, error: Option<String>) -> Self {
        Event::JobStatus(JobStatusEvent {
            job_id: job_id.to_string(),
            state,
            error,
        })
    }

    pub fn progress(
        job_id: &str,
        video_id: Option<&str>,
        current: u64,
        total: u64,
        label: &str,
    ) -> Self {
        Event::Progress(ProgressEvent {
            job_id: job_id.to_string(),
            video_id: video_id.map(str::to_string),
            current,
            total,
            label: label.to_string(),
        })
    }

    pub fn log(job_id: &str, video_id: Option<&str>, level: LogLevel, message: impl Into<String>) -> Self {
        Event::Log(LogEvent {
            job_id: job_id.to_string(),
            video_id: video_id.map(str::to_string),
            level,
            message: message.into(),
        })
    }

    pub fn state(job_id: &str, video_id: &str, updates: FieldMap) -> Self {
        Event::State(StateEvent {
            job_id: job_id.to_string(),
            video_id: video_id.to_string(),
            updates,
        })
    }

    /// Job the event belongs to.
    pub fn job_id(&self) -> &str {
        match self {
            Event::JobStatus(e) => &e.job_id,
            Event::Progress(e) => &e.job_id,
            Event::Log(e) => &e.job_id,
            Event::State(e) => &e.job_id,
        }
    }

    /// Short type tag, matching the serialized `type` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::JobStatus(_) => "job_status",
            Event::Progress(_) => "progress",
            Event::Log(_) => "log",
            Event::State(_) => "state",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::progress("job1", Some("v1"), 1, 3, "transcribe (v1)");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["current"], 1);
        assert_eq!(json["label"], "transcribe (v1)");
    }

    #[test]
    fn job_status_omits_missing_error() {
        let event = Event::job_status("job1", JobState::Running, None);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"state\":\"running\""));
        assert!(!json.contains("error"));
        assert_eq!(event.event_type(), "job_status");
        assert_eq!(event.job_id(), "job1");
    }
}
