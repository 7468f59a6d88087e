//! Local video store
//!
//! Saved videos live flat in one directory and are named
//! `video_{unix.fraction}.mov`. The gallery lists them newest first.

use super::{StorageError, StorageResult, StorageSink};
use crate::utils::time::{fractional_timestamp, parse_fractional_timestamp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;

/// Extensions the gallery recognises
const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// A video found in the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredVideo {
    pub path: PathBuf,
    pub file_name: String,

    /// Creation time, or modification time where the filesystem has none
    pub created_at: Option<DateTime<Utc>>,

    pub size_bytes: u64,
}

impl StoredVideo {
    /// Timestamp embedded in the file name, if any
    pub fn name_timestamp(&self) -> Option<f64> {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.rsplit('_').next())
            .and_then(parse_fractional_timestamp)
    }

    /// Newest first
    fn newest_first(a: &StoredVideo, b: &StoredVideo) -> Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| {
            b.name_timestamp()
                .partial_cmp(&a.name_timestamp())
                .unwrap_or(Ordering::Equal)
        })
    }
}

/// Name for a video stored at `at`
pub fn stored_file_name(at: DateTime<Utc>) -> String {
    format!("video_{}.mov", fractional_timestamp(at))
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Move `source` into `dir` under a fresh timestamped name.
///
/// Data goes to a temporary file in the same directory first, so a failed
/// copy never leaves a half-written video behind. The source is removed only
/// once the stored file is in place.
fn move_into_store(source: &Path, dir: &Path) -> StorageResult<PathBuf> {
    if !source.is_file() {
        return Err(StorageError::MissingSource(source.to_path_buf()));
    }
    std::fs::create_dir_all(dir)?;

    let destination = dir.join(stored_file_name(Utc::now()));

    let mut staged = NamedTempFile::new_in(dir)?;
    let mut input = File::open(source)?;
    io::copy(&mut input, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    if destination.exists() {
        std::fs::remove_file(&destination)?;
    }
    staged
        .persist(&destination)
        .map_err(|e| StorageError::Io(e.error))?;

    if let Err(e) = std::fs::remove_file(source) {
        tracing::warn!("Could not remove recording {:?}: {}", source, e);
    }

    Ok(destination)
}

/// Manages saved videos in an app-private directory
#[derive(Debug, Clone)]
pub struct VideoStorageManager {
    videos_dir: PathBuf,
}

impl VideoStorageManager {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// List stored videos, newest first
    pub async fn list_videos(&self) -> StorageResult<Vec<StoredVideo>> {
        let mut entries = match fs::read_dir(&self.videos_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut videos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_video_file(&path) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            let created_at = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .map(DateTime::<Utc>::from);

            videos.push(StoredVideo {
                file_name: entry.file_name().to_string_lossy().to_string(),
                path,
                created_at,
                size_bytes: metadata.len(),
            });
        }

        videos.sort_by(StoredVideo::newest_first);

        tracing::debug!("Found {} local videos", videos.len());
        Ok(videos)
    }

    /// Delete one stored video
    pub async fn delete_video(&self, path: &Path) -> StorageResult<()> {
        if path.parent() != Some(self.videos_dir.as_path()) {
            return Err(StorageError::OutsideStore(path.to_path_buf()));
        }
        fs::remove_file(path).await?;
        tracing::info!("Deleted video {:?}", path);
        Ok(())
    }
}

#[async_trait]
impl StorageSink for VideoStorageManager {
    async fn save(&self, source: &Path) -> StorageResult<PathBuf> {
        let source = source.to_path_buf();
        let dir = self.videos_dir.clone();

        let result = tokio::task::spawn_blocking(move || move_into_store(&source, &dir))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?;

        match &result {
            Ok(destination) => tracing::info!("Video moved to {:?}", destination),
            Err(e) => tracing::error!("Error saving video: {}", e),
        }
        result
    }
}
