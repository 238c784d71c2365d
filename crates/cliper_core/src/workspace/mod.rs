//! Per-run output directories and artifact copying.
//!
//! Every job gets its own directory under the runs root:
//!
//! ```text
//! {runs_root}/{slug}_{job_id}/
//!     {video_id}/
//!         transcribe/
//!         clips/
//!         export/
//! ```
//!
//! Directories are created lazily and never removed here. Artifacts are
//! copied in (never moved), so the originals referenced by the state store
//! stay valid.

use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

use crate::events::FieldMap;
use crate::orchestrator::{StepError, StepResult};
use crate::store::StateStore;

/// Default maximum slug length.
pub const SLUG_MAX_LEN: usize = 48;

/// Result of copying an artifact into the run workspace.
#[derive(Debug)]
pub enum CopyOutcome {
    /// File copied to this destination.
    Copied(PathBuf),
    /// Source did not exist; nothing to do.
    SourceAbsent,
    /// Source existed but the copy failed.
    Failed(io::Error),
}

impl CopyOutcome {
    /// Destination path, if the copy happened.
    pub fn copied(&self) -> Option<&Path> {
        match self {
            CopyOutcome::Copied(path) => Some(path),
            _ => None,
        }
    }

    pub fn into_copied(self) -> Option<PathBuf> {
        match self {
            CopyOutcome::Copied(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CopyOutcome::Failed(_))
    }
}

/// Turn arbitrary text into a short, filesystem-safe name.
///
/// Output contains only `[a-z0-9._-]`, never starts or ends with a
/// separator, has no repeated underscores and is never empty.
/// `slugify(slugify(x)) == slugify(x)`.
pub fn slugify(value: &str, max_len: usize) -> String {
    let lowered = value.trim().to_lowercase();

    let mut cleaned = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
        {
            c
        } else {
            '_'
        };
        // Collapse runs of underscores
        if mapped == '_' && cleaned.ends_with('_') {
            continue;
        }
        cleaned.push(mapped);
    }

    let is_sep = |c: char| matches!(c, '.' | '_' | '-');
    let trimmed = cleaned.trim_matches(is_sep);
    if trimmed.is_empty() {
        return "run".chars().take(max_len.max(1)).collect();
    }

    // Only ASCII remains, so byte and char offsets agree.
    let truncated = &trimmed[..trimmed.len().min(max_len.max(1))];
    truncated.trim_end_matches(is_sep).to_string()
}

/// Layout of the run workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    runs_root: PathBuf,
    temp_dir: PathBuf,
}

impl Default for RunWorkspace {
    fn default() -> Self {
        Self {
            runs_root: PathBuf::from("output").join("runs"),
            temp_dir: PathBuf::from("temp"),
        }
    }
}

impl RunWorkspace {
    pub fn new(runs_root: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs_root: runs_root.into(),
            temp_dir: temp_dir.into(),
        }
    }

    /// Default layout rooted at `base` instead of the working directory.
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self::new(base.join("output").join("runs"), base.join("temp"))
    }

    pub fn runs_root(&self) -> &Path {
        &self.runs_root
    }

    /// Directory where the transcriber leaves scratch audio.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Directory name for a job: `{slug(first video stem or "job")}_{job_id}`.
    pub fn run_name(&self, store: &dyn StateStore, job_id: &str, video_ids: &[String]) -> String {
        let stem = video_ids
            .first()
            .and_then(|id| store.get_video_path(id))
            .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .filter(|s| !s.is_empty());

        format!(
            "{}_{}",
            slugify(stem.as_deref().unwrap_or("job"), SLUG_MAX_LEN),
            job_id
        )
    }

    /// Create the job's run directory and record it in the job status.
    pub fn ensure_run_output_dir(
        &self,
        store: &dyn StateStore,
        job_id: &str,
        video_ids: &[String],
    ) -> StepResult<PathBuf> {
        let run_dir = self
            .runs_root
            .join(self.run_name(store, job_id, video_ids));
        fs::create_dir_all(&run_dir)
            .map_err(|e| StepError::io_error("creating run output directory", e))?;

        let mut fields = FieldMap::new();
        fields.insert(
            "run_output_dir".to_string(),
            Value::String(run_dir.display().to_string()),
        );
        store.update_job_status(job_id, fields)?;

        tracing::debug!("Run output directory: {}", run_dir.display());
        Ok(run_dir)
    }

    /// Create `{run_dir}/{video_id}`.
    pub fn ensure_video_run_dir(&self, run_dir: &Path, video_id: &str) -> StepResult<PathBuf> {
        let video_dir = run_dir.join(video_id);
        fs::create_dir_all(&video_dir)
            .map_err(|e| StepError::io_error("creating video run directory", e))?;
        Ok(video_dir)
    }

    /// Where the transcriber leaves extracted audio for `video_path`.
    pub fn scratch_audio_path(&self, video_path: &Path) -> PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.temp_dir.join(format!("{}_audio.wav", stem))
    }
}

/// Copy `src` to `dst` if `src` exists, creating parent directories.
///
/// The modification time is carried over when the platform allows it.
pub fn copy_if_exists(src: &Path, dst: &Path) -> CopyOutcome {
    if !src.is_file() {
        return CopyOutcome::SourceAbsent;
    }
    match copy_preserving_mtime(src, dst) {
        Ok(()) => CopyOutcome::Copied(dst.to_path_buf()),
        Err(e) => CopyOutcome::Failed(e),
    }
}

fn copy_preserving_mtime(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    // Copying a file onto itself would truncate it
    if dst.exists() && fs::canonicalize(src)? == fs::canonicalize(dst)? {
        return Ok(());
    }

    fs::copy(src, dst)?;

    let preserved = fs::metadata(src)
        .and_then(|m| m.modified())
        .and_then(|mtime| File::options().write(true).open(dst)?.set_modified(mtime));
    if let Err(e) = preserved {
        tracing::debug!("Could not preserve mtime on {}: {}", dst.display(), e);
    }
    Ok(())
}

/// Copy an exported artifact under `{video_run_dir}/export/`.
///
/// The part of `src` after its first `export` component is kept, so
/// exporter subdirectories (per style, per aspect ratio) survive. Paths
/// without such a component land directly under `export/`.
pub fn copy_exported_clip(src: &Path, video_run_dir: &Path) -> CopyOutcome {
    if !src.is_file() {
        return CopyOutcome::SourceAbsent;
    }

    let components: Vec<Component<'_>> = src.components().collect();
    let relative: PathBuf = match components
        .iter()
        .position(|c| c.as_os_str() == "export")
    {
        Some(idx) if idx + 1 < components.len() => components[idx + 1..].iter().collect(),
        _ => src.file_name().map(PathBuf::from).unwrap_or_default(),
    };

    copy_if_exists(src, &video_run_dir.join("export").join(relative))
}

/// Point a JSON transcript's `audio_path` at `audio`.
///
/// Non-JSON files, unparseable content and non-object documents are left
/// untouched. Returns whether the file was rewritten.
pub fn rewrite_transcript_audio_path(transcript: &Path, audio: &Path) -> io::Result<bool> {
    let is_json = transcript
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json || !transcript.is_file() || !audio.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(transcript)?;
    let mut data = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Ok(false),
        Err(e) => {
            tracing::debug!("Transcript {} is not valid JSON: {}", transcript.display(), e);
            return Ok(false);
        }
    };

    data.insert(
        "audio_path".to_string(),
        Value::String(audio.display().to_string()),
    );
    let json = serde_json::to_string_pretty(&Value::Object(data))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(transcript, json)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonStateStore;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    #[test]
    fn slugify_shapes_names() {
        assert_eq!(slugify("My Great Video!!", SLUG_MAX_LEN), "my_great_video");
        assert_eq!(slugify("  --Hello__World--  ", SLUG_MAX_LEN), "hello_world");
        assert_eq!(slugify("Ünïcode Title", SLUG_MAX_LEN), "n_code_title");
        assert_eq!(slugify("v1.2-final", SLUG_MAX_LEN), "v1.2-final");
        assert_eq!(slugify("", SLUG_MAX_LEN), "run");
        assert_eq!(slugify("!!!", SLUG_MAX_LEN), "run");
    }

    #[test]
    fn slugify_truncates_cleanly() {
        let long = format!("{}_tail", "a".repeat(47));
        let slug = slugify(&long, SLUG_MAX_LEN);
        assert_eq!(slug, "a".repeat(47));
        assert!(slug.len() <= SLUG_MAX_LEN);
    }

    #[test]
    fn slugify_is_idempotent() {
        let inputs = [
            "My Great Video!!",
            "a  b\tc",
            "__x__",
            "Ünïcode Title",
            "some-really-long-title-that-keeps-going-and-going-past-the-limit",
            "a.b.c_",
            "",
        ];
        for input in inputs {
            let once = slugify(input, SLUG_MAX_LEN);
            assert_eq!(slugify(&once, SLUG_MAX_LEN), once, "input: {:?}", input);
            assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || ".-_".contains(c)));
            assert!(!once.contains("__"));
        }
    }

    #[test]
    fn run_dir_named_after_first_video() {
        let dir = tempdir().unwrap();
        let store = JsonStateStore::in_memory();
        store
            .register_video("v1", "My Talk.mp4", Some(Path::new("/videos/My Talk.mp4")), None)
            .unwrap();
        let workspace = RunWorkspace::rooted_at(dir.path());

        let run_dir = workspace
            .ensure_run_output_dir(&store, "job7", &["v1".to_string()])
            .unwrap();

        assert!(run_dir.is_dir());
        assert!(run_dir.ends_with("output/runs/my_talk_job7"));
        let status = store.get_job_status("job7").unwrap();
        assert_eq!(status["run_output_dir"], run_dir.display().to_string());
    }

    #[test]
    fn run_dir_falls_back_to_job() {
        let store = JsonStateStore::in_memory();
        let workspace = RunWorkspace::default();
        assert_eq!(
            workspace.run_name(&store, "j1", &["unknown".to_string()]),
            "job_j1"
        );
        assert_eq!(workspace.run_name(&store, "j1", &[]), "job_j1");
    }

    #[test]
    fn scratch_audio_uses_stem() {
        let workspace = RunWorkspace::new("runs", "scratch");
        assert_eq!(
            workspace.scratch_audio_path(Path::new("/videos/talk.mp4")),
            PathBuf::from("scratch/talk_audio.wav")
        );
    }

    #[test]
    fn copy_preserves_content_and_mtime() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        fs::write(&src, "hello").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let dst = dir.path().join("nested").join("dst.txt");
        let outcome = copy_if_exists(&src, &dst);

        assert_eq!(outcome.copied(), Some(dst.as_path()));
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
        let src_mtime = fs::metadata(&src).unwrap().modified().unwrap();
        let dst_mtime = fs::metadata(&dst).unwrap().modified().unwrap();
        assert_eq!(src_mtime, dst_mtime);
    }

    #[test]
    fn copy_missing_source_is_absent() {
        let dir = tempdir().unwrap();
        let outcome = copy_if_exists(&dir.path().join("nope"), &dir.path().join("dst"));
        assert!(matches!(outcome, CopyOutcome::SourceAbsent));
        assert!(!dir.path().join("dst").exists());
    }

    #[test]
    fn copy_onto_itself_keeps_content() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("same.txt");
        fs::write(&src, "keep me").unwrap();

        let outcome = copy_if_exists(&src, &src);
        assert!(outcome.copied().is_some());
        assert_eq!(fs::read_to_string(&src).unwrap(), "keep me");
    }

    #[test]
    fn exported_clip_rerooted_after_export_component() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("old").join("export").join("9x16").join("clip_1.mp4");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, "video").unwrap();
        let video_run_dir = dir.path().join("run").join("v1");

        let outcome = copy_exported_clip(&src, &video_run_dir);
        assert_eq!(
            outcome.into_copied(),
            Some(video_run_dir.join("export").join("9x16").join("clip_1.mp4"))
        );
    }

    #[test]
    fn exported_clip_without_export_component_uses_name() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("exported-files").join("clip_2.mp4");
        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, "video").unwrap();
        let video_run_dir = dir.path().join("run").join("v1");

        let outcome = copy_exported_clip(&src, &video_run_dir);
        assert_eq!(
            outcome.into_copied(),
            Some(video_run_dir.join("export").join("clip_2.mp4"))
        );
    }

    #[test]
    fn rewrites_json_transcript_audio_path() {
        let dir = tempdir().unwrap();
        let transcript = dir.path().join("t.json");
        let audio = dir.path().join("a.wav");
        fs::write(&transcript, r#"{"segments": [], "language": "es"}"#).unwrap();
        fs::write(&audio, "wav").unwrap();

        assert!(rewrite_transcript_audio_path(&transcript, &audio).unwrap());
        let data: Value = serde_json::from_str(&fs::read_to_string(&transcript).unwrap()).unwrap();
        assert_eq!(data["audio_path"], audio.display().to_string());
        assert_eq!(data["language"], "es");
    }

    #[test]
    fn ignores_non_json_or_malformed_transcripts() {
        let dir = tempdir().unwrap();
        let audio = dir.path().join("a.wav");
        fs::write(&audio, "wav").unwrap();

        let srt = dir.path().join("t.srt");
        fs::write(&srt, "1\n00:00:00,000 --> 00:00:01,000\nhi\n").unwrap();
        assert!(!rewrite_transcript_audio_path(&srt, &audio).unwrap());

        let broken = dir.path().join("b.json");
        fs::write(&broken, "{oops").unwrap();
        assert!(!rewrite_transcript_audio_path(&broken, &audio).unwrap());
        assert_eq!(fs::read_to_string(&broken).unwrap(), "{oops");

        let list = dir.path().join("l.json");
        fs::write(&list, "[1, 2]").unwrap();
        assert!(!rewrite_transcript_audio_path(&list, &audio).unwrap());
    }
}
