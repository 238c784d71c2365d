//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::logging::{LogConfig, LogLevel};
use crate::models::JobSettings;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Step settings applied to newly created jobs.
    #[serde(default)]
    pub defaults: JobSettings,
}

/// Path configuration for outputs, scratch files and state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root of everything the pipeline writes.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Subdirectory of `output_root` holding per-job run directories.
    #[serde(default = "default_runs_subdir")]
    pub runs_subdir: String,

    /// Scratch directory where extracted audio is left.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Where downloaded source videos are stored.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,

    /// Folder for application log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Durable state store file.
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_output_root() -> String {
    "output".to_string()
}

fn default_runs_subdir() -> String {
    "runs".to_string()
}

fn default_temp_dir() -> String {
    "temp".to_string()
}

fn default_downloads_dir() -> String {
    "downloads".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_state_file() -> String {
    "output/state.json".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            runs_subdir: default_runs_subdir(),
            temp_dir: default_temp_dir(),
            downloads_dir: default_downloads_dir(),
            logs_folder: default_logs_folder(),
            state_file: default_state_file(),
        }
    }
}

impl PathSettings {
    /// `{output_root}/{runs_subdir}`.
    pub fn runs_root(&self) -> PathBuf {
        PathBuf::from(&self.output_root).join(&self.runs_subdir)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to job logs and the console.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            progress_step: default_progress_step(),
        }
    }
}

impl LoggingSettings {
    /// Per-job logger configuration.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            compact: self.compact,
            progress_step: self.progress_step,
            ..LogConfig::default()
        }
    }
}

/// Configuration sections for atomic updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Logging,
    Defaults,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Defaults => "defaults",
        }
    }

    /// Comment written above the section.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, scratch and state locations",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Defaults => "Step settings for new jobs",
        }
    }

    pub fn all() -> [ConfigSection; 3] {
        [
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Defaults,
        ]
    }
}
