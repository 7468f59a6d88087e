//! Coordinator handle
//!
//! Runs a [`CaptureSessionCoordinator`] on its own background task so every
//! mutating operation is serialized through one mailbox. Recording finish
//! reports and timer ticks enter the same task, and observers follow along
//! through the broadcast event stream.

use super::coordinator::CaptureSessionCoordinator;
use super::error::CaptureResult;
use super::state::{CoordinatorEvent, CoordinatorState};
use super::timer::RecordingTimer;
use crate::capture::{Bounds, CameraPosition, RecordingFinished};
use crate::utils::error::{AppError, AppResult};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

/// How long a closing coordinator waits for an outstanding finish report
const FINISH_GRACE: Duration = Duration::from_secs(5);

enum Command {
    Prepare(oneshot::Sender<CaptureResult<()>>),
    SwitchCamera(oneshot::Sender<CaptureResult<CameraPosition>>),
    StartRecording(oneshot::Sender<CaptureResult<PathBuf>>),
    StopRecording(oneshot::Sender<CaptureResult<()>>),
    SetPreviewBounds { main: Bounds, pip: Bounds },
    Teardown(oneshot::Sender<()>),
}

/// Async front for a coordinator running on a background task
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    state: Arc<RwLock<CoordinatorState>>,
    events: broadcast::Sender<CoordinatorEvent>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Move the coordinator onto a background task
    pub fn spawn(mut coordinator: CaptureSessionCoordinator, tick_interval: Duration) -> Self {
        let (commands, mailbox) = mpsc::channel(32);
        let state = coordinator.state_handle();
        let events = coordinator.event_sender();
        let finished = coordinator.finish_reports();
        let timer = RecordingTimer::new(tick_interval);

        let task = tokio::spawn(run(coordinator, mailbox, finished, timer));
        tracing::debug!("Coordinator task started");

        Self {
            commands,
            state,
            events,
            task,
        }
    }

    /// Current state, read without going through the mailbox
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> AppResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| AppError::CoordinatorGone)?;
        response.await.map_err(|_| AppError::CoordinatorGone)
    }

    pub async fn prepare(&self) -> AppResult<()> {
        Ok(self.request(Command::Prepare).await??)
    }

    pub async fn switch_camera(&self) -> AppResult<CameraPosition> {
        Ok(self.request(Command::SwitchCamera).await??)
    }

    pub async fn start_recording(&self) -> AppResult<PathBuf> {
        Ok(self.request(Command::StartRecording).await??)
    }

    pub async fn stop_recording(&self) -> AppResult<()> {
        Ok(self.request(Command::StopRecording).await??)
    }

    pub async fn set_preview_bounds(&self, main: Bounds, pip: Bounds) -> AppResult<()> {
        self.commands
            .send(Command::SetPreviewBounds { main, pip })
            .await
            .map_err(|_| AppError::CoordinatorGone)
    }

    /// Tear the session down; the handle stays usable for a later `prepare`
    pub async fn teardown(&self) -> AppResult<()> {
        self.request(Command::Teardown).await
    }

    /// Tear down and wait for the background task to exit
    pub async fn shutdown(self) {
        let _ = self.teardown().await;
        drop(self.commands);
        let _ = self.task.await;
    }
}

async fn run(
    mut coordinator: CaptureSessionCoordinator,
    mut mailbox: mpsc::Receiver<Command>,
    mut finished: mpsc::UnboundedReceiver<RecordingFinished>,
    mut timer: RecordingTimer,
) {
    loop {
        tokio::select! {
            biased;

            Some(report) = finished.recv() => {
                if let Err(e) = coordinator.on_recording_finished(report).await {
                    tracing::warn!("Recording not saved: {}", e);
                }
            }
            command = mailbox.recv() => match command {
                Some(command) => handle(&mut coordinator, command).await,
                None => break,
            },
            Some(generation) = timer.next_tick() => {
                if timer.is_current(generation) {
                    coordinator.on_timer_tick();
                }
            }
        }
        timer.sync(coordinator.is_recording());
    }

    timer.stop();
    coordinator.teardown();
    drain_finished(&mut coordinator, &mut finished).await;
    tracing::debug!("Coordinator task exited");
}

/// Hand off the recording stopped by teardown before the task exits
async fn drain_finished(
    coordinator: &mut CaptureSessionCoordinator,
    finished: &mut mpsc::UnboundedReceiver<RecordingFinished>,
) {
    while coordinator.recording().is_some() {
        match time::timeout(FINISH_GRACE, finished.recv()).await {
            Ok(Some(report)) => {
                if let Err(e) = coordinator.on_recording_finished(report).await {
                    tracing::warn!("Recording not saved: {}", e);
                }
            }
            Ok(None) => break,
            Err(_) => {
                tracing::error!("Recording finish report never arrived, file not saved");
                break;
            }
        }
    }
}

async fn handle(coordinator: &mut CaptureSessionCoordinator, command: Command) {
    match command {
        Command::Prepare(reply) => {
            let _ = reply.send(coordinator.prepare().await);
        }
        Command::SwitchCamera(reply) => {
            let _ = reply.send(coordinator.switch_active_camera());
        }
        Command::StartRecording(reply) => {
            let _ = reply.send(coordinator.start_recording());
        }
        Command::StopRecording(reply) => {
            let _ = reply.send(coordinator.stop_recording());
        }
        Command::SetPreviewBounds { main, pip } => coordinator.set_preview_bounds(main, pip),
        Command::Teardown(reply) => {
            coordinator.teardown();
            let _ = reply.send(());
        }
    }
}
