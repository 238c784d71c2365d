//! Per-video durable record and clip descriptors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_content_type() -> String {
    "tutorial".to_string()
}

/// A candidate highlight clip produced by the clip generator.
///
/// Fields the engine does not interpret are kept in `extra` so that a
/// generator's output survives a round trip through the state store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClipDescriptor {
    #[serde(default)]
    pub clip_id: u32,
    /// Start offset in seconds.
    pub start_time: f64,
    /// End offset in seconds.
    pub end_time: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ClipDescriptor {
    pub fn new(clip_id: u32, start_time: f64, end_time: f64, text: impl Into<String>) -> Self {
        Self {
            clip_id,
            start_time,
            end_time,
            text: text.into(),
            title: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Durable pipeline progress for one video.
///
/// Each completed step sets its "done" flag together with the artifact
/// paths it produced; the two are always written in the same update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default)]
    pub downloaded: bool,

    #[serde(default)]
    pub transcribed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_audio_path: Option<PathBuf>,

    #[serde(default)]
    pub clips_generated: bool,
    #[serde(default)]
    pub clips: Vec<ClipDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clips_metadata_path: Option<PathBuf>,

    #[serde(default)]
    pub clips_exported: bool,
    #[serde(default)]
    pub exported_clips: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// Per-clip subtitle style overrides, keyed by clip id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_styles: Option<serde_json::Map<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl VideoRecord {
    /// Create a freshly registered record.
    pub fn new(video_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            filename: filename.into(),
            content_type: default_content_type(),
            ..Default::default()
        }
    }

    /// Stamp the record as updated now.
    pub fn touch(&mut self) {
        self.updated_at = Some(chrono::Local::now().to_rfc3339());
    }

    /// Short human-readable status as shown in library listings.
    pub fn status_summary(&self) -> String {
        let mut parts = Vec::new();
        if self.transcribed {
            parts.push("Transcribed".to_string());
        }
        if self.clips_generated {
            parts.push(format!("Clips: {}", self.clips.len()));
        }
        if self.clips_exported {
            parts.push("Exported".to_string());
        }
        if parts.is_empty() {
            "Ready".to_string()
        } else {
            parts.join(" | ")
        }
    }

    /// One badge per stage: downloaded, transcribed, clips, exported.
    pub fn progress_badges(&self) -> String {
        [
            self.downloaded,
            self.transcribed,
            self.clips_generated,
            self.clips_exported,
        ]
        .iter()
        .map(|done| if *done { '✓' } else { '○' })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_summary_lists_completed_stages() {
        let mut record = VideoRecord::new("v1", "v1.mp4");
        assert_eq!(record.status_summary(), "Ready");

        record.transcribed = true;
        record.clips_generated = true;
        record.clips = vec![ClipDescriptor::new(1, 0.0, 30.0, "a")];
        assert_eq!(record.status_summary(), "Transcribed | Clips: 1");

        record.clips_exported = true;
        assert_eq!(record.status_summary(), "Transcribed | Clips: 1 | Exported");
    }

    #[test]
    fn badges_follow_stage_order() {
        let mut record = VideoRecord::new("v1", "v1.mp4");
        record.downloaded = true;
        record.clips_generated = true;
        assert_eq!(record.progress_badges(), "✓○✓○");
    }

    #[test]
    fn clip_keeps_unknown_fields() {
        let json = r#"{"clip_id":2,"start_time":1.5,"end_time":40.0,"text":"hi","score":0.8}"#;
        let clip: ClipDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(clip.clip_id, 2);
        assert_eq!(clip.extra.get("score").and_then(|v| v.as_f64()), Some(0.8));

        let back = serde_json::to_string(&clip).unwrap();
        assert!(back.contains("\"score\":0.8"));
    }

    #[test]
    fn legacy_record_uses_defaults() {
        let record: VideoRecord = serde_json::from_str(r#"{"video_id":"abc"}"#).unwrap();
        assert_eq!(record.content_type, "tutorial");
        assert!(!record.transcribed);
        assert!(record.clips.is_empty());
    }
}
