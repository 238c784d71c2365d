//! JSON-file state store with atomic persistence.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{StateStore, StoreError, StoreResult};
use crate::events::FieldMap;
use crate::models::{ClipDescriptor, VideoRecord};

const STATE_VERSION: u32 = 1;

/// Persistent state (saved to the state file).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    videos: BTreeMap<String, VideoRecord>,
    #[serde(default)]
    jobs: BTreeMap<String, FieldMap>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            videos: BTreeMap::new(),
            jobs: BTreeMap::new(),
        }
    }
}

/// State store backed by a single JSON file.
///
/// All access goes through one mutex, so writes for any video are
/// serialized. A mutation is applied to a copy, written to disk, and only
/// then becomes visible; a failed write leaves the previous state intact.
#[derive(Debug)]
pub struct JsonStateStore {
    state: Mutex<StateFile>,
    /// Empty for in-memory stores.
    state_file: PathBuf,
}

impl JsonStateStore {
    /// Open a store persisted at `state_file`, loading it if present.
    ///
    /// An unreadable or corrupt file is logged and treated as empty.
    pub fn open(state_file: impl Into<PathBuf>) -> Self {
        let state_file = state_file.into();

        let state = if state_file.exists() {
            match fs::read_to_string(&state_file) {
                Ok(content) => match serde_json::from_str::<StateFile>(&content) {
                    Ok(state) => {
                        tracing::info!(
                            "Loaded {} videos from {}",
                            state.videos.len(),
                            state_file.display()
                        );
                        state
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", state_file.display(), e);
                        StateFile::default()
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", state_file.display(), e);
                    StateFile::default()
                }
            }
        } else {
            StateFile::default()
        };

        Self {
            state: Mutex::new(state),
            state_file,
        }
    }

    /// Create a store without persistence (for testing).
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(StateFile::default()),
            state_file: PathBuf::new(),
        }
    }

    /// Path of the backing file, if persistent.
    pub fn path(&self) -> Option<&Path> {
        if self.state_file.as_os_str().is_empty() {
            None
        } else {
            Some(&self.state_file)
        }
    }

    fn save(&self, state: &StateFile) -> StoreResult<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)?;

        // Write atomically via temp file
        let temp_file = path.with_extension("json.tmp");
        fs::write(&temp_file, &json).map_err(|e| StoreError::io(&temp_file, e))?;
        fs::rename(&temp_file, path).map_err(|e| StoreError::io(path, e))?;

        tracing::debug!("Saved {} videos to {}", state.videos.len(), path.display());
        Ok(())
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut StateFile) -> R) -> StoreResult<R> {
        let mut guard = self.state.lock();
        let mut next = guard.clone();
        let result = f(&mut next);
        self.save(&next)?;
        *guard = next;
        Ok(result)
    }

    fn upsert_video(&self, video_id: &str, f: impl FnOnce(&mut VideoRecord)) -> StoreResult<()> {
        self.mutate(|state| {
            let record = state
                .videos
                .entry(video_id.to_string())
                .or_insert_with(|| VideoRecord::new(video_id, ""));
            f(record);
            record.touch();
        })
    }
}

impl StateStore for JsonStateStore {
    fn register_video(
        &self,
        video_id: &str,
        filename: &str,
        video_path: Option<&Path>,
        content_type: Option<&str>,
    ) -> StoreResult<()> {
        self.upsert_video(video_id, |record| {
            record.filename = filename.to_string();
            if let Some(path) = video_path {
                record.video_path = Some(path.to_path_buf());
                record.downloaded = true;
            }
            if let Some(content_type) = content_type {
                record.content_type = content_type.to_string();
            }
        })
    }

    fn get_video_path(&self, video_id: &str) -> Option<PathBuf> {
        self.state
            .lock()
            .videos
            .get(video_id)
            .and_then(|v| v.video_path.clone())
    }

    fn get_video_state(&self, video_id: &str) -> Option<VideoRecord> {
        self.state.lock().videos.get(video_id).cloned()
    }

    fn get_all_videos(&self) -> Vec<VideoRecord> {
        self.state.lock().videos.values().cloned().collect()
    }

    fn mark_transcribed(
        &self,
        video_id: &str,
        transcript_path: &Path,
        audio_path: Option<&Path>,
    ) -> StoreResult<()> {
        self.upsert_video(video_id, |record| {
            record.transcribed = true;
            record.transcript_path = Some(transcript_path.to_path_buf());
            if let Some(audio) = audio_path {
                record.transcript_audio_path = Some(audio.to_path_buf());
            }
        })
    }

    fn mark_clips_generated(
        &self,
        video_id: &str,
        clips: &[ClipDescriptor],
        clips_metadata_path: &Path,
    ) -> StoreResult<()> {
        self.upsert_video(video_id, |record| {
            record.clips_generated = !clips.is_empty();
            record.clips = clips.to_vec();
            record.clips_metadata_path = Some(clips_metadata_path.to_path_buf());
        })
    }

    fn mark_clips_exported(
        &self,
        video_id: &str,
        exported_paths: &[PathBuf],
        aspect_ratio: Option<&str>,
    ) -> StoreResult<()> {
        self.upsert_video(video_id, |record| {
            record.clips_exported = !exported_paths.is_empty();
            record.exported_clips = exported_paths.to_vec();
            record.aspect_ratio = aspect_ratio.map(str::to_string);
        })
    }

    fn update_job_status(&self, job_id: &str, fields: FieldMap) -> StoreResult<()> {
        self.mutate(|state| {
            let entry = state.jobs.entry(job_id.to_string()).or_default();
            for (key, value) in fields {
                entry.insert(key, value);
            }
        })
    }

    fn get_job_status(&self, job_id: &str) -> Option<FieldMap> {
        self.state.lock().jobs.get(job_id).cloned()
    }

    fn clear_video_state(&self, video_id: &str) -> StoreResult<bool> {
        self.mutate(|state| state.videos.remove(video_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn register_and_lookup() {
        let store = JsonStateStore::in_memory();
        store
            .register_video("v1", "v1.mp4", Some(Path::new("/videos/v1.mp4")), None)
            .unwrap();

        assert_eq!(
            store.get_video_path("v1"),
            Some(PathBuf::from("/videos/v1.mp4"))
        );
        let record = store.get_video_state("v1").unwrap();
        assert!(record.downloaded);
        assert_eq!(record.content_type, "tutorial");
        assert!(store.get_video_state("missing").is_none());
    }

    #[test]
    fn marks_are_idempotent() {
        let store = JsonStateStore::in_memory();
        let transcript = Path::new("/t/v1.json");
        store.mark_transcribed("v1", transcript, None).unwrap();
        store.mark_transcribed("v1", transcript, None).unwrap();

        assert!(store.is_transcribed("v1"));
        let record = store.get_video_state("v1").unwrap();
        assert_eq!(record.transcript_path.as_deref(), Some(transcript));
        assert_eq!(store.get_all_videos().len(), 1);
    }

    #[test]
    fn register_keeps_progress() {
        let store = JsonStateStore::in_memory();
        store.mark_transcribed("v1", Path::new("/t/v1.json"), None).unwrap();
        store
            .register_video("v1", "v1.mp4", Some(Path::new("/v/v1.mp4")), Some("podcast"))
            .unwrap();

        let record = store.get_video_state("v1").unwrap();
        assert!(record.transcribed);
        assert_eq!(record.content_type, "podcast");
    }

    #[test]
    fn clips_flag_tracks_artifacts() {
        let store = JsonStateStore::in_memory();
        let clips = vec![ClipDescriptor::new(1, 0.0, 30.0, "hello")];
        store
            .mark_clips_generated("v1", &clips, Path::new("/c/v1_clips.json"))
            .unwrap();
        let record = store.get_video_state("v1").unwrap();
        assert!(record.clips_generated);
        assert_eq!(record.clips, clips);

        store.mark_clips_exported("v1", &[], Some("9:16")).unwrap();
        let record = store.get_video_state("v1").unwrap();
        assert!(!record.clips_exported);
        assert_eq!(record.aspect_ratio.as_deref(), Some("9:16"));
    }

    #[test]
    fn job_status_fields_merge() {
        let store = JsonStateStore::in_memory();
        store
            .update_job_status("j1", fields(json!({"run_output_dir": "output/runs/a_j1"})))
            .unwrap();
        store
            .update_job_status("j1", fields(json!({"final_video_path": "x.mp4"})))
            .unwrap();

        let status = store.get_job_status("j1").unwrap();
        assert_eq!(status["run_output_dir"], "output/runs/a_j1");
        assert_eq!(status["final_video_path"], "x.mp4");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state").join("state.json");

        {
            let store = JsonStateStore::open(&path);
            store
                .register_video("v1", "v1.mp4", Some(Path::new("/v/v1.mp4")), None)
                .unwrap();
            store.mark_transcribed("v1", Path::new("/t/v1.json"), None).unwrap();
        }

        let reopened = JsonStateStore::open(&path);
        assert!(reopened.is_transcribed("v1"));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let store = JsonStateStore::open(&path);
        assert!(store.get_all_videos().is_empty());
    }

    #[test]
    fn clear_removes_record() {
        let store = JsonStateStore::in_memory();
        store.register_video("v1", "v1.mp4", None, None).unwrap();
        assert!(store.clear_video_state("v1").unwrap());
        assert!(!store.clear_video_state("v1").unwrap());
        assert!(store.get_video_state("v1").is_none());
    }
}
