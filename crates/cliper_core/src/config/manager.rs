//! Config manager for loading, saving, and atomic updates.
//!
//! Key features:
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates (only modified section is changed)
//! - Validation of job defaults on load
//! - Preserves comments in untouched sections with toml_edit

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};
use crate::logging::LogConfig;
use crate::orchestrator::ConfigError;
use crate::store::JsonStateStore;
use crate::workspace::RunWorkspace;

/// Errors that can occur during config file operations.
#[derive(Error, Debug)]
pub enum ConfigFileError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Invalid job defaults: {0}")]
    InvalidDefaults(#[from] ConfigError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigFileError>;

const HEADER: &str = "# Cliper configuration\n\
# This file is auto-generated. Comments are preserved on section updates.\n\n";

/// Manages application configuration.
///
/// Handles loading, saving, and atomic section-level updates.
pub struct ConfigManager {
    /// Path to the config file.
    config_path: PathBuf,
    /// Current settings loaded in memory.
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager with the given config file path.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get a mutable reference to the current settings.
    ///
    /// Changes stay in memory until `save()` or `update_section()`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load config from file.
    ///
    /// Returns error if file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigFileError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = parse_and_validate(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// A file with unknown sections or missing keys is rewritten.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = parse_validate_and_clean(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::info!("Normalizing config file {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Ensure all configured directories exist.
    ///
    /// Should be called after `load_or_create()`.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        let mut dirs = vec![
            paths.runs_root(),
            PathBuf::from(&paths.temp_dir),
            PathBuf::from(&paths.downloads_dir),
            PathBuf::from(&paths.logs_folder),
        ];
        if let Some(parent) = self.state_file().parent() {
            dirs.push(parent.to_path_buf());
        }

        for dir in dirs {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(&dir)?;
            }
        }

        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    pub fn downloads_dir(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.downloads_dir)
    }

    pub fn state_file(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.state_file)
    }

    /// Run workspace layout described by the paths section.
    pub fn workspace(&self) -> RunWorkspace {
        RunWorkspace::new(
            self.settings.paths.runs_root(),
            &self.settings.paths.temp_dir,
        )
    }

    /// Open the configured state store.
    pub fn open_state_store(&self) -> JsonStateStore {
        JsonStateStore::open(self.state_file())
    }

    pub fn log_config(&self) -> LogConfig {
        self.settings.logging.log_config()
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk, replaces only the specified section and
    /// writes back atomically, so other sections (and their comments) are
    /// left as they are on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_doc: DocumentMut = self.section_toml(section)?.parse()?;
        let mut section_table = section_doc.as_table().clone();

        // Keep the existing comment above the section
        if let Some(existing) = doc.get(section.table_name()).and_then(Item::as_table) {
            if let Some(prefix) = existing.decor().prefix() {
                section_table.decor_mut().set_prefix(prefix.clone());
            }
        }

        doc[section.table_name()] = Item::Table(section_table);
        self.atomic_write(&doc.to_string())?;

        Ok(())
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let toml = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
            ConfigSection::Defaults => toml::to_string_pretty(&self.settings.defaults)?,
        };
        Ok(toml)
    }

    /// Generate config content with a comment above each section.
    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut doc: DocumentMut = toml::to_string_pretty(&self.settings)?.parse()?;

        for section in ConfigSection::all() {
            if let Some(table) = doc
                .get_mut(section.table_name())
                .and_then(Item::as_table_mut)
            {
                // Sections holding only subtables are implicit and would drop the comment
                table.set_implicit(false);
                table
                    .decor_mut()
                    .set_prefix(format!("\n# {}\n", section.description()));
            }
        }

        Ok(format!("{}{}", HEADER, doc.to_string().trim_start()))
    }

    /// Write content to config file atomically.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file in same directory (for atomic rename)
        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn parse_and_validate(content: &str) -> ConfigResult<Settings> {
    let settings: Settings = toml::from_str(content)?;
    settings.defaults.validate()?;
    Ok(settings)
}

/// Parse, validate and report whether the file needs rewriting.
fn parse_validate_and_clean(content: &str) -> ConfigResult<(Settings, bool)> {
    let doc: DocumentMut = content.parse()?;
    let settings = parse_and_validate(content)?;

    let valid_sections: Vec<&str> = ConfigSection::all()
        .iter()
        .map(ConfigSection::table_name)
        .collect();
    let has_unknown = doc.iter().any(|(key, _)| !valid_sections.contains(&key));

    let expected: DocumentMut = toml::to_string_pretty(&settings)?.parse()?;
    let has_missing = !all_keys_present(&doc, &expected);

    Ok((settings, has_unknown || has_missing))
}

fn all_keys_present(actual: &DocumentMut, expected: &DocumentMut) -> bool {
    fn walk(actual: &toml_edit::Table, expected: &toml_edit::Table) -> bool {
        expected.iter().all(|(key, item)| match (item, actual.get(key)) {
            (Item::Table(expected_sub), Some(Item::Table(actual_sub))) => {
                walk(actual_sub, expected_sub)
            }
            (_, found) => found.is_some(),
        })
    }
    walk(actual.as_table(), expected.as_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("cliper.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.starts_with("# Cliper configuration"));
        assert!(content.contains("[paths]"));
        assert!(content.contains("# Logging configuration\n[logging]"));
        assert!(content.contains("[defaults.export]"));

        let reloaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(&reloaded, manager.settings());
    }

    #[test]
    fn load_or_create_preserves_existing() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cliper.toml");
        fs::write(&config_path, "[paths]\noutput_root = \"my_output\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.output_root, "my_output");
        assert_eq!(
            manager.workspace().runs_root(),
            Path::new("my_output").join("runs")
        );
        // Missing sections were filled in on disk
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[logging]"));
        assert!(content.contains("my_output"));
    }

    #[test]
    fn complete_file_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cliper.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();
        let mut content = fs::read_to_string(&config_path).unwrap();
        content.push_str("# trailing note\n");
        fs::write(&config_path, &content).unwrap();

        let mut again = ConfigManager::new(&config_path);
        again.load_or_create().unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), content);
    }

    #[test]
    fn invalid_defaults_are_rejected() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cliper.toml");
        fs::write(
            &config_path,
            "[defaults.clips]\nmin_seconds = 90\nmax_seconds = 30\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        let err = manager.load().unwrap_err();
        assert!(matches!(err, ConfigFileError::InvalidDefaults(_)));
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(
            manager.load().unwrap_err(),
            ConfigFileError::NotFound(_)
        ));
    }

    #[test]
    fn update_section_only_changes_target() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cliper.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        // Hand edit on disk that the in-memory settings do not know about
        let content = fs::read_to_string(&config_path).unwrap();
        fs::write(
            &config_path,
            content.replace("output_root = \"output\"", "output_root = \"edited\""),
        )
        .unwrap();

        manager.settings_mut().logging.compact = false;
        manager.settings_mut().logging.level = LogLevel::Debug;
        manager.update_section(ConfigSection::Logging).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("compact = false"));
        assert!(content.contains("level = \"DEBUG\""));
        assert!(content.contains("output_root = \"edited\""));
        assert!(content.contains("# Logging configuration"));
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut manager = ConfigManager::new(root.join("cliper.toml"));
        {
            let paths = &mut manager.settings_mut().paths;
            paths.output_root = root.join("out").display().to_string();
            paths.temp_dir = root.join("tmp").display().to_string();
            paths.downloads_dir = root.join("dl").display().to_string();
            paths.logs_folder = root.join("logs").display().to_string();
            paths.state_file = root.join("state").join("state.json").display().to_string();
        }

        manager.ensure_dirs_exist().unwrap();

        assert!(root.join("out").join("runs").is_dir());
        assert!(root.join("tmp").is_dir());
        assert!(root.join("dl").is_dir());
        assert!(root.join("logs").is_dir());
        assert!(root.join("state").is_dir());
    }

    #[test]
    fn atomic_write_creates_no_temp_on_success() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("cliper.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let temp_path = config_path.with_extension("toml.tmp");
        assert!(!temp_path.exists());
    }
}
