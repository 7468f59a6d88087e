//! Recording persistence
//!
//! Finished recordings are handed to a [`StorageSink`], which moves them
//! into app-private storage where the gallery can find them.

pub mod manager;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use manager::{StoredVideo, VideoStorageManager};

/// Storage-related errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source file not found: {0:?}")]
    MissingSource(PathBuf),

    #[error("Path is not inside the video store: {0:?}")]
    OutsideStore(PathBuf),

    #[error("Storage task failed: {0}")]
    Task(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for finished recordings
#[async_trait]
pub trait StorageSink: Send + Sync {
    /// Persist `source` and return where it was stored. On failure the
    /// source is left untouched.
    async fn save(&self, source: &Path) -> StorageResult<PathBuf>;
}
