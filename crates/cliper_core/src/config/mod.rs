//! Application configuration.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Default job settings that front ends start new jobs from
//!
//! # Example
//!
//! ```no_run
//! use cliper_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/cliper.toml");
//! config.load_or_create().unwrap();
//! config.ensure_dirs_exist().unwrap();
//!
//! println!("Runs go to: {}", config.workspace().runs_root().display());
//!
//! config.settings_mut().defaults.clips.max_clips = 5;
//! config.update_section(ConfigSection::Defaults).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigFileError, ConfigManager, ConfigResult};
pub use settings::{ConfigSection, LoggingSettings, PathSettings, Settings};
