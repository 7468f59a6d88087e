//! Short-form video feed
//!
//! A local catalog standing in for a network feed: sample videos with
//! synthetic metadata, cached after the first fetch.

pub mod catalog;
pub mod item;

pub use catalog::VideoFeed;
pub use item::VideoItem;
