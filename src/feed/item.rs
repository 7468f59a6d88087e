//! Feed item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    pub id: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
    pub view_count: u64,
    pub like_count: u64,
    pub hashtags: Option<String>,
}

impl VideoItem {
    /// Create an item with a fresh id, posted now
    pub fn new(video_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            video_url: video_url.into(),
            thumbnail_url: None,
            title: None,
            creator: None,
            duration_secs: 0.0,
            created_at: Utc::now(),
            view_count: 0,
            like_count: 0,
            hashtags: None,
        }
    }

    /// Duration as `m:ss`
    pub fn formatted_duration(&self) -> String {
        let total = self.duration_secs.max(0.0) as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }

    pub fn formatted_views(&self) -> String {
        compact_count(self.view_count)
    }

    pub fn formatted_likes(&self) -> String {
        compact_count(self.like_count)
    }

    /// Relative age such as `5m ago`, `3h ago` or `2d ago`
    pub fn time_ago(&self) -> String {
        self.time_ago_at(Utc::now())
    }

    pub fn time_ago_at(&self, now: DateTime<Utc>) -> String {
        let secs = (now - self.created_at).num_seconds().max(0);
        if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else if secs < 86_400 {
            format!("{}h ago", secs / 3600)
        } else {
            format!("{}d ago", secs / 86_400)
        }
    }
}

/// `950`, `1.2K`, `3.4M`
fn compact_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_formatted_duration() {
        let mut item = VideoItem::new("https://example.com/a.mp4");
        item.duration_secs = 90.0;
        assert_eq!(item.formatted_duration(), "1:30");
        item.duration_secs = 5.0;
        assert_eq!(item.formatted_duration(), "0:05");
    }

    #[test]
    fn test_compact_counts() {
        assert_eq!(compact_count(950), "950");
        assert_eq!(compact_count(1_240), "1.2K");
        assert_eq!(compact_count(3_400_000), "3.4M");
    }

    #[test]
    fn test_time_ago_buckets() {
        let now = Utc::now();
        let mut item = VideoItem::new("https://example.com/a.mp4");

        item.created_at = now - Duration::minutes(5);
        assert_eq!(item.time_ago_at(now), "5m ago");
        item.created_at = now - Duration::hours(3);
        assert_eq!(item.time_ago_at(now), "3h ago");
        item.created_at = now - Duration::days(2);
        assert_eq!(item.time_ago_at(now), "2d ago");
    }
}
