//! Video library: discovering downloaded videos and registering them.
//!
//! Video ids are file stems. A second file with the same stem at a
//! different location gets a short hash of its canonical path appended,
//! so both can live in the store side by side.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::store::{StateStore, StoreError};

/// File extensions (lower case) treated as videos.
pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "m4v", "mov", "mkv", "webm"];

const ID_HASH_LEN: usize = 8;

/// Errors raised while scanning the library.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A registered video whose source file exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub video_id: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Whether `path` has a supported video extension (case-insensitive).
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Id under which `video_path` is (or would be) registered.
pub fn unique_video_id(store: &dyn StateStore, video_path: &Path) -> String {
    let base = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let resolved = resolve(video_path);

    let Some(existing) = store.get_video_state(&base) else {
        return base;
    };
    match existing.video_path.as_deref() {
        // A record without a source file is free to claim
        None => base,
        Some(path) if resolve(path) == resolved => base,
        Some(_) => format!("{}_{}", base, short_hash(&resolved.to_string_lossy())),
    }
}

/// Scan `downloads_dir`, register every video found, and list the library.
///
/// Returns every registered video whose file exists, sorted by file name
/// (case-insensitive). Registered videos without a path are matched to
/// `{downloads_dir}/{filename}` when that file exists.
pub fn discover_videos(
    store: &dyn StateStore,
    downloads_dir: &Path,
) -> Result<Vec<LibraryEntry>, LibraryError> {
    fs::create_dir_all(downloads_dir).map_err(|e| io_error(downloads_dir, e))?;

    let mut found = Vec::new();
    for entry in fs::read_dir(downloads_dir).map_err(|e| io_error(downloads_dir, e))? {
        let path = entry.map_err(|e| io_error(downloads_dir, e))?.path();
        if path.is_file() && is_supported_video(&path) {
            found.push(path);
        }
    }
    found.sort();

    for path in &found {
        let video_id = unique_video_id(store, path);
        register_if_changed(store, &video_id, path)?;
    }
    tracing::debug!(
        "Found {} video(s) in {}",
        found.len(),
        downloads_dir.display()
    );

    let mut entries = Vec::new();
    for record in store.get_all_videos() {
        let filename = if record.filename.is_empty() {
            format!("{}.mp4", record.video_id)
        } else {
            record.filename.clone()
        };

        let path = match record.video_path {
            Some(path) => path,
            None => {
                let fallback = downloads_dir.join(&filename);
                if !fallback.is_file() {
                    continue;
                }
                store.register_video(&record.video_id, &filename, Some(fallback.as_path()), None)?;
                fallback
            }
        };

        if path.is_file() {
            entries.push(LibraryEntry {
                video_id: record.video_id,
                filename,
                path,
            });
        }
    }

    entries.sort_by_key(|e| e.filename.to_lowercase());
    Ok(entries)
}

fn register_if_changed(
    store: &dyn StateStore,
    video_id: &str,
    path: &Path,
) -> Result<(), StoreError> {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let unchanged = store
        .get_video_state(video_id)
        .map(|r| r.filename == filename && r.video_path.as_deref() == Some(path))
        .unwrap_or(false);
    if unchanged {
        return Ok(());
    }

    tracing::info!("Registering video {} ({})", video_id, path.display());
    store.register_video(video_id, &filename, Some(path), None)
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn short_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    hash[..ID_HASH_LEN].to_string()
}

fn io_error(path: &Path, source: io::Error) -> LibraryError {
    LibraryError::Io {
        path: path.to_path_buf(),
        source,
    }
}
