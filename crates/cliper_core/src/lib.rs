//! Cliper Core - Job orchestration and state tracking for the video-to-clip pipeline
//!
//! This crate runs transcribe, clip generation and export over a batch of
//! downloaded videos, remembers what each video has already been through,
//! and reports progress through events. The heavy lifting (speech
//! recognition, clip selection, rendering) is done by collaborators
//! supplied by the caller. It has zero UI dependencies.

pub mod config;
pub mod events;
pub mod library;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod stages;
pub mod store;
pub mod workspace;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
