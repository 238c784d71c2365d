//! Error types for the job runner.
//!
//! `ConfigError` rejects a job before it runs. `StepError` stops a running
//! job; the runner converts it into a failed status and never propagates it.

use std::io;

use thiserror::Error;

use crate::models::JobStep;
use crate::store::StoreError;

/// The job cannot be run as specified.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Step is known but cannot be part of a job.
    #[error("{0} is not supported as a job step; download and register videos before submitting a job")]
    UnsupportedStep(JobStep),

    /// A setting is out of range.
    #[error("Invalid setting '{field}': {message}")]
    InvalidSetting { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_setting(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// A previous step has not produced what this one needs.
    #[error("{0}")]
    PreconditionFailed(String),

    /// The store has no source file for the video.
    #[error("Video path not registered for: {0}")]
    VideoNotRegistered(String),

    /// An external collaborator failed or returned nothing.
    #[error("{0}")]
    Collaborator(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Persisting progress failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StepError {
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn video_not_registered(video_id: impl Into<String>) -> Self {
        Self::VideoNotRegistered(video_id.into())
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator(message.into())
    }

    /// Wrap a collaborator error, keeping its full context chain.
    pub fn from_collaborator(err: anyhow::Error) -> Self {
        Self::Collaborator(format!("{:#}", err))
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_message_is_verbatim() {
        let err = StepError::from_collaborator(anyhow::anyhow!("export boom"));
        assert_eq!(err.to_string(), "export boom");

        let err = StepError::collaborator("Transcription failed (no transcript returned)");
        assert_eq!(err.to_string(), "Transcription failed (no transcript returned)");
    }

    #[test]
    fn missing_video_names_the_id() {
        let err = StepError::video_not_registered("v9");
        assert_eq!(err.to_string(), "Video path not registered for: v9");
    }

    #[test]
    fn config_error_names_field() {
        let err = ConfigError::invalid_setting("clips.max_seconds", "too small");
        assert!(err.to_string().contains("clips.max_seconds"));

        let err = ConfigError::UnsupportedStep(JobStep::Download);
        assert!(err.to_string().starts_with("download is not supported"));
    }
}
