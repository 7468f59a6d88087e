//! Runs one capture session against the in-memory platform: prepare,
//! swap cameras, record a short clip, then list the gallery.

use anyhow::Context;
use dual_camera_lib::capture::simulated::{SimulatedBackend, SimulatedPermissions, SimulatedPreview};
use dual_camera_lib::capture::Bounds;
use dual_camera_lib::config::AppConfig;
use dual_camera_lib::feed::VideoFeed;
use dual_camera_lib::recorder::{
    format_elapsed, CaptureSessionCoordinator, CoordinatorEvent, CoordinatorHandle, PreviewPair,
};
use dual_camera_lib::storage::VideoStorageManager;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dual_camera_lib::init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dual-camera.json"));
    let config = AppConfig::load(&config_path).context("loading config")?;

    let feed = VideoFeed::new(config.feed.clone());
    tracing::info!("Feed has {} videos", feed.fetch_videos().len());

    let storage = VideoStorageManager::new(&config.storage.videos_dir);
    let coordinator = CaptureSessionCoordinator::new(
        config.capture.clone(),
        Box::new(SimulatedBackend::new()),
        Arc::new(SimulatedPermissions::granted()),
        Arc::new(storage.clone()),
        PreviewPair {
            front: Arc::new(SimulatedPreview::new()),
            back: Arc::new(SimulatedPreview::new()),
        },
    );
    let handle = CoordinatorHandle::spawn(coordinator, config.capture.tick_interval());
    let mut events = handle.subscribe();

    handle.prepare().await?;
    handle
        .set_preview_bounds(Bounds::new(0.0, 0.0, 390.0, 700.0), Bounds::new(250.0, 60.0, 120.0, 160.0))
        .await?;
    let active = handle.switch_camera().await?;
    tracing::info!("Main camera is now {}", active);

    let path = handle.start_recording().await?;
    tracing::info!("Recording to {:?}", path);

    loop {
        match events.recv().await? {
            CoordinatorEvent::Progress { elapsed_secs, .. } => {
                tracing::info!("Recording {}", format_elapsed(elapsed_secs));
                if elapsed_secs == 3 {
                    if let Err(e) = handle.stop_recording().await {
                        tracing::warn!("Stop ignored: {}", e);
                    }
                }
            }
            CoordinatorEvent::RecordingSaved { path } => {
                tracing::info!("Saved {:?}", path);
                break;
            }
            CoordinatorEvent::RecordingFailed { reason } => {
                anyhow::bail!("recording failed: {reason}");
            }
            _ => {}
        }
    }

    for video in storage.list_videos().await? {
        tracing::info!("{} ({} bytes)", video.file_name, video.size_bytes);
    }

    handle.shutdown().await;
    Ok(())
}
