//! Mock feed catalog
//!
//! Generates feed items from the configured sample URLs and keeps the
//! current feed in memory so repeated fetches are instant.

use super::item::VideoItem;
use crate::config::FeedConfig;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::Rng;

const TITLES: &[&str] = &[
    "Amazing Dual POV Adventure",
    "Creative Storytelling Magic",
    "Behind the Scenes Moments",
    "Epic Travel Journey",
    "Cooking Masterclass",
    "Dance Challenge",
    "Tech Review & Tips",
    "Fitness Motivation Daily",
    "Art Creation Process",
    "Music Production Studio",
];

const CREATORS: &[&str] = &[
    "@CreativeGenius",
    "@TechExplorer",
    "@ArtisticSoul",
    "@AdventureSeeker",
    "@FoodieFinds",
    "@FitnessGuru",
    "@MusicMaker",
    "@NatureLover",
];

const HASHTAGS: &[&str] = &[
    "#trending #viral #fyp",
    "#creative #art #amazing",
    "#tech #review #tips",
    "#fitness #motivation #workout",
    "#travel #adventure #explore",
];

const FRESH_TITLES: &[&str] = &[
    "Just Dropped: Epic Collab",
    "Breaking: Viral Moment",
    "Trending Now: Must Watch",
    "Fresh Content Alert",
    "Creator Spotlight",
];

const DURATIONS: &[f64] = &[15.0, 30.0, 45.0, 60.0, 90.0, 120.0];
const BASE_VIEWS: &[u64] = &[100, 500, 1_000, 5_000, 10_000, 50_000, 100_000];

/// In-memory feed of sample videos
pub struct VideoFeed {
    config: FeedConfig,
    items: RwLock<Vec<VideoItem>>,
}

impl VideoFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            items: RwLock::new(Vec::new()),
        }
    }

    /// Current feed, generated on first use
    pub fn fetch_videos(&self) -> Vec<VideoItem> {
        {
            let items = self.items.read();
            if !items.is_empty() {
                return items.clone();
            }
        }

        let generated = self.generate(Utc::now());
        tracing::info!("Generated {} feed videos", generated.len());
        *self.items.write() = generated.clone();
        generated
    }

    /// Shuffle the feed, put fresh items on top and cap its length
    pub fn refresh(&self) -> Vec<VideoItem> {
        let mut items = self.items.write();
        let mut refreshed = std::mem::take(&mut *items);
        refreshed.shuffle(&mut rand::thread_rng());

        let mut refreshed = {
            let mut fresh = self.fresh_items(self.config.refresh_batch, Utc::now());
            fresh.extend(refreshed);
            fresh
        };
        refreshed.truncate(self.config.max_feed_len);

        tracing::info!("Refreshed feed with {} videos", refreshed.len());
        *items = refreshed.clone();
        refreshed
    }

    pub fn clear(&self) {
        self.items.write().clear();
        tracing::debug!("Feed cache cleared");
    }

    fn url_at(&self, index: usize) -> String {
        match self.config.video_urls.len() {
            0 => String::new(),
            len => self.config.video_urls[index % len].clone(),
        }
    }

    fn generate(&self, now: DateTime<Utc>) -> Vec<VideoItem> {
        let mut rng = rand::thread_rng();
        (0..self.config.initial_count)
            .map(|index| {
                let view_count = BASE_VIEWS[index % BASE_VIEWS.len()] * 20u64.saturating_sub(index as u64).max(1);
                let like_ratio: f64 = rng.gen_range(0.05..0.15);
                VideoItem {
                    id: format!("video_{}_{}", index, now.timestamp_millis()),
                    video_url: self.url_at(index),
                    thumbnail_url: Some(thumbnail_url(index)),
                    title: Some(TITLES[index % TITLES.len()].to_string()),
                    creator: Some(CREATORS[index % CREATORS.len()].to_string()),
                    duration_secs: DURATIONS[index % DURATIONS.len()],
                    created_at: now - Duration::hours(index as i64),
                    view_count,
                    like_count: (view_count as f64 * like_ratio) as u64,
                    hashtags: Some(HASHTAGS[index % HASHTAGS.len()].to_string()),
                }
            })
            .collect()
    }

    fn fresh_items(&self, count: usize, now: DateTime<Utc>) -> Vec<VideoItem> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|index| VideoItem {
                id: format!("new_video_{}_{}", index, now.timestamp_millis()),
                video_url: self.url_at(index),
                thumbnail_url: Some(thumbnail_url(index + 100)),
                title: Some(FRESH_TITLES[index % FRESH_TITLES.len()].to_string()),
                creator: Some(format!("@TrendingCreator{}", index + 1)),
                duration_secs: [30.0, 60.0, 90.0][index % 3],
                created_at: now,
                view_count: rng.gen_range(1_000..=10_000),
                like_count: rng.gen_range(100..=1_000),
                hashtags: Some("#new #trending #viral".to_string()),
            })
            .collect()
    }
}

fn thumbnail_url(index: usize) -> String {
    let (width, height) = [(320, 240), (400, 300), (480, 360)][index % 3];
    format!("https://picsum.photos/{width}/{height}?random={index}")
}
