//! Typed per-step job settings.
//!
//! Every field has a serde default, so a partially specified job (or an
//! empty `{}`) resolves to the documented defaults. Validation happens when
//! a job is submitted, never mid-run.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::orchestrator::ConfigError;

fn default_true() -> bool {
    true
}

/// Settings for all steps of a job, keyed by section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub transcribe: TranscribeSettings,
    #[serde(default)]
    pub clips: ClipSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

impl JobSettings {
    /// Check every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clips.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

/// Transcription options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscribeSettings {
    /// Model size passed to the speech engine.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_device")]
    pub device: String,
    /// Compute precision.
    #[serde(default = "default_compute_type")]
    pub compute_type: String,
    /// Source language; `None` lets the engine detect it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Skip the step when the store already marks the video transcribed.
    #[serde(default = "default_true")]
    pub skip_done: bool,
    /// Let the engine reuse a transcript already present on disk.
    #[serde(default = "default_true")]
    pub skip_if_exists: bool,
}

fn default_model() -> String {
    "base".to_string()
}

fn default_device() -> String {
    "auto".to_string()
}

fn default_compute_type() -> String {
    "int8".to_string()
}

impl Default for TranscribeSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            device: default_device(),
            compute_type: default_compute_type(),
            language: None,
            skip_done: true,
            skip_if_exists: true,
        }
    }
}

/// Clip generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSettings {
    #[serde(default = "default_min_seconds")]
    pub min_seconds: u32,
    #[serde(default = "default_max_seconds")]
    pub max_seconds: u32,
    #[serde(default = "default_min_clips")]
    pub min_clips: u32,
    #[serde(default = "default_max_clips")]
    pub max_clips: u32,
    #[serde(default = "default_true")]
    pub skip_done: bool,
}

fn default_min_seconds() -> u32 {
    30
}

fn default_max_seconds() -> u32 {
    90
}

fn default_min_clips() -> u32 {
    3
}

fn default_max_clips() -> u32 {
    10
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            min_seconds: default_min_seconds(),
            max_seconds: default_max_seconds(),
            min_clips: default_min_clips(),
            max_clips: default_max_clips(),
            skip_done: true,
        }
    }
}

impl ClipSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_seconds == 0 {
            return Err(ConfigError::invalid_setting(
                "clips.min_seconds",
                "minimum duration must be greater than 0",
            ));
        }
        if self.min_seconds >= self.max_seconds {
            return Err(ConfigError::invalid_setting(
                "clips.max_seconds",
                format!(
                    "minimum duration ({}s) must be less than maximum ({}s)",
                    self.min_seconds, self.max_seconds
                ),
            ));
        }
        if self.min_clips == 0 || self.min_clips > self.max_clips {
            return Err(ConfigError::invalid_setting(
                "clips.min_clips",
                format!(
                    "clip count range {}..={} is empty",
                    self.min_clips, self.max_clips
                ),
            ));
        }
        Ok(())
    }
}

/// Corner used when compositing a logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl LogoPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogoPosition::TopLeft => "top-left",
            LogoPosition::TopRight => "top-right",
            LogoPosition::BottomLeft => "bottom-left",
            LogoPosition::BottomRight => "bottom-right",
        }
    }
}

/// Export options; passed through to the exporter untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Target aspect ratio such as `9:16`; `None` keeps the source aspect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default)]
    pub add_subtitles: bool,
    #[serde(default = "default_subtitle_style")]
    pub subtitle_style: String,
    #[serde(default)]
    pub organize_by_style: bool,
    #[serde(default)]
    pub enable_face_tracking: bool,
    #[serde(default = "default_face_tracking_strategy")]
    pub face_tracking_strategy: String,
    /// Analyse every Nth frame when tracking faces.
    #[serde(default = "default_face_tracking_sample_rate")]
    pub face_tracking_sample_rate: u32,
    #[serde(default)]
    pub add_logo: bool,
    #[serde(default = "default_logo_path")]
    pub logo_path: PathBuf,
    #[serde(default)]
    pub logo_position: LogoPosition,
    /// Logo width relative to the frame width.
    #[serde(default = "default_logo_scale")]
    pub logo_scale: f64,
    #[serde(default = "default_true")]
    pub skip_done: bool,
}

fn default_subtitle_style() -> String {
    "default".to_string()
}

fn default_face_tracking_strategy() -> String {
    "keep_in_frame".to_string()
}

fn default_face_tracking_sample_rate() -> u32 {
    3
}

fn default_logo_path() -> PathBuf {
    PathBuf::from("assets/logo.png")
}

fn default_logo_scale() -> f64 {
    0.1
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            aspect_ratio: None,
            add_subtitles: false,
            subtitle_style: default_subtitle_style(),
            organize_by_style: false,
            enable_face_tracking: false,
            face_tracking_strategy: default_face_tracking_strategy(),
            face_tracking_sample_rate: default_face_tracking_sample_rate(),
            add_logo: false,
            logo_path: default_logo_path(),
            logo_position: LogoPosition::default(),
            logo_scale: default_logo_scale(),
            skip_done: true,
        }
    }
}

impl ExportSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.face_tracking_sample_rate == 0 {
            return Err(ConfigError::invalid_setting(
                "export.face_tracking_sample_rate",
                "sample rate must be at least 1",
            ));
        }
        if !(self.logo_scale > 0.0 && self.logo_scale <= 1.0) {
            return Err(ConfigError::invalid_setting(
                "export.logo_scale",
                format!("logo scale must be in (0, 1], got {}", self.logo_scale),
            ));
        }
        if self.add_logo {
            validate_logo_path(&self.logo_path)?;
        }
        Ok(())
    }
}

const LOGO_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = b"\xff\xd8\xff";

/// A logo must be a PNG or JPEG. A missing file is left to the exporter,
/// which falls back to its bundled logo; an existing one must carry the
/// signature its extension promises.
fn validate_logo_path(path: &Path) -> Result<(), ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !LOGO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ConfigError::invalid_setting(
            "export.logo_path",
            format!("logo must be a PNG or JPEG file, got {}", path.display()),
        ));
    }

    if path.is_file() {
        let expected = if ext == "png" { PNG_SIGNATURE } else { JPEG_SIGNATURE };
        if !has_signature(path, expected) {
            return Err(ConfigError::invalid_setting(
                "export.logo_path",
                format!("{} is not a valid {} image", path.display(), ext.to_uppercase()),
            ));
        }
    }
    Ok(())
}

fn has_signature(path: &Path, signature: &[u8]) -> bool {
    let mut header = Vec::with_capacity(signature.len());
    File::open(path)
        .and_then(|f| f.take(signature.len() as u64).read_to_end(&mut header))
        .map(|_| header == signature)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_settings_use_defaults() {
        let settings: JobSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, JobSettings::default());
        assert_eq!(settings.transcribe.model, "base");
        assert_eq!(settings.transcribe.compute_type, "int8");
        assert_eq!(settings.clips.max_seconds, 90);
        assert_eq!(settings.export.face_tracking_strategy, "keep_in_frame");
        assert_eq!(settings.export.logo_position, LogoPosition::TopRight);
        assert!(settings.export.skip_done);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let settings: JobSettings =
            serde_json::from_str(r#"{"clips":{"max_clips":4},"export":{"logo_position":"bottom-left"}}"#)
                .unwrap();
        assert_eq!(settings.clips.max_clips, 4);
        assert_eq!(settings.clips.min_clips, 3);
        assert_eq!(settings.export.logo_position, LogoPosition::BottomLeft);
    }

    #[test]
    fn rejects_inverted_duration_range() {
        let clips = ClipSettings {
            min_seconds: 90,
            max_seconds: 30,
            ..Default::default()
        };
        let err = clips.validate().unwrap_err();
        assert!(err.to_string().contains("clips.max_seconds"));
    }

    #[test]
    fn rejects_empty_clip_count_range() {
        let clips = ClipSettings {
            min_clips: 5,
            max_clips: 2,
            ..Default::default()
        };
        assert!(clips.validate().is_err());
    }

    #[test]
    fn rejects_bad_logo_scale() {
        let export = ExportSettings {
            logo_scale: 0.0,
            ..Default::default()
        };
        assert!(export.validate().is_err());
        assert!(ExportSettings::default().validate().is_ok());
    }

    fn with_logo(path: PathBuf) -> ExportSettings {
        ExportSettings {
            add_logo: true,
            logo_path: path,
            ..Default::default()
        }
    }

    #[test]
    fn logo_must_be_png_or_jpeg() {
        let err = with_logo(PathBuf::from("assets/logo.gif")).validate().unwrap_err();
        assert!(err.to_string().contains("export.logo_path"));
        assert!(with_logo(PathBuf::from("assets/logo")).validate().is_err());

        // Missing files are resolved by the exporter
        assert!(with_logo(PathBuf::from("missing/brand.JPG")).validate().is_ok());
        assert!(with_logo(default_logo_path()).validate().is_ok());
    }

    #[test]
    fn logo_signature_must_match_extension() {
        let dir = tempfile::tempdir().unwrap();

        let png = dir.path().join("brand.png");
        std::fs::write(&png, b"\x89PNG\r\n\x1a\nrest-of-image").unwrap();
        assert!(with_logo(png).validate().is_ok());

        let jpeg = dir.path().join("brand.jpeg");
        std::fs::write(&jpeg, b"\xff\xd8\xff\xe0data").unwrap();
        assert!(with_logo(jpeg).validate().is_ok());

        let fake = dir.path().join("fake.png");
        std::fs::write(&fake, b"not an image").unwrap();
        let err = with_logo(fake).validate().unwrap_err();
        assert!(err.to_string().contains("not a valid PNG image"));

        let short = dir.path().join("short.jpg");
        std::fs::write(&short, b"\xff").unwrap();
        assert!(with_logo(short).validate().is_err());
    }

    #[test]
    fn logo_path_ignored_without_logo() {
        let export = ExportSettings {
            add_logo: false,
            logo_path: PathBuf::from("notes.txt"),
            ..Default::default()
        };
        assert!(export.validate().is_ok());
    }
}
