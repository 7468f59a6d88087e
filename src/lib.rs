//! DualCamera - picture-in-picture dual-camera capture core.
//!
//! This is the main library crate for the DualCamera app. It provides the
//! capture session coordinator and the local collaborators around it
//! (recording storage, the sample feed and the data cache).

pub mod cache;
pub mod capture;
pub mod config;
pub mod feed;
pub mod recorder;
pub mod storage;
pub mod utils;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// Honors `RUST_LOG`; defaults to debug output for this crate.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dual_camera=debug,dual_camera_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    tracing::info!("Starting DualCamera v{}", env!("CARGO_PKG_VERSION"));
}
