//! Application configuration
//!
//! Product constants (recording cap, feed catalog, cache limits) live here
//! instead of in code. Loaded from a JSON file; every field has a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::error::{AppError, AppResult};

/// Capture coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureConfig {
    /// Recordings stop automatically after this many seconds
    pub max_recording_secs: u32,

    /// Recording timer period in milliseconds
    pub tick_interval_ms: u64,

    /// Where in-progress recordings are written
    pub recordings_dir: PathBuf,

    /// Broadcast buffer for coordinator events
    pub event_capacity: usize,
}

impl CaptureConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_recording_secs: 15,
            tick_interval_ms: 1000,
            recordings_dir: std::env::temp_dir().join("dual-camera").join("recordings"),
            event_capacity: 100,
        }
    }
}

/// Persistent video storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// App-private directory holding saved videos
    pub videos_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            videos_dir: std::env::temp_dir().join("dual-camera").join("videos"),
        }
    }
}

/// Mock feed catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedConfig {
    /// Sample video URLs the catalog cycles through
    pub video_urls: Vec<String>,

    /// Items generated for the first fetch
    pub initial_count: usize,

    /// Fresh items prepended on refresh
    pub refresh_batch: usize,

    /// Longest feed kept after a refresh
    pub max_feed_len: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let base = "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample";
        let video_urls = [
            "BigBuckBunny.mp4",
            "ElephantsDream.mp4",
            "ForBiggerBlazes.mp4",
            "ForBiggerEscapes.mp4",
            "ForBiggerFun.mp4",
            "ForBiggerJoyrides.mp4",
            "ForBiggerMeltdowns.mp4",
            "Sintel.mp4",
            "SubaruOutbackOnStreetAndDirt.mp4",
            "TearsOfSteel.mp4",
            "VolkswagenGTIReview.mp4",
            "WeAreGoingOnBullrun.mp4",
        ]
        .iter()
        .map(|name| format!("{base}/{name}"))
        .collect();

        Self {
            video_urls,
            initial_count: 20,
            refresh_batch: 5,
            max_feed_len: 25,
        }
    }
}

/// In-memory thumbnail/data cache limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    pub count_limit: usize,
    pub total_cost_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            count_limit: 50,
            total_cost_limit: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub storage: StorageConfig,
    pub feed: FeedConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Load configuration from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.capture.max_recording_secs == 0 {
            return Err(AppError::Config(
                "maxRecordingSecs must be at least 1".to_string(),
            ));
        }
        if self.feed.video_urls.is_empty() {
            return Err(AppError::Config("feed.videoUrls must not be empty".to_string()));
        }
        Ok(())
    }
}
