//! Logging infrastructure.
//!
//! This module provides:
//! - Global `tracing` setup for host applications
//! - Per-job log files that mirror the runner's event stream
//!
//! # Example
//!
//! ```no_run
//! use cliper_core::logging::{init_tracing, JobLogger, LogConfig, LogLevel};
//!
//! init_tracing(LogLevel::Info);
//!
//! let logger = JobLogger::new("job_42", "output/runs/demo_job_42", LogConfig::default()).unwrap();
//! logger.phase("transcribe");
//! logger.success("Transcription complete");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` and falls back to `default_level`. Call once at
/// application startup; later calls are ignored.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.as_filter_str(), "info");
    }

    #[test]
    fn init_tracing_is_repeatable() {
        init_test_tracing();
        init_tracing(LogLevel::Warn);
        init_tracing(LogLevel::Warn);
    }
}
