//! Capture session coordinator
//!
//! Owns the hardware capture session and drives it through permission
//! acquisition, configuration, camera switching and bounded recording.
//! The coordinator itself is thread-agnostic: it never spawns or sleeps,
//! and publishes every observable change as a [`CoordinatorEvent`].

use super::error::{CaptureError, CaptureResult};
use super::state::{
    format_elapsed, CoordinatorEvent, CoordinatorState, FailureReason, PreviewLayout,
    RecordingSession, StatusMessage,
};
use crate::capture::{
    Bounds, CameraPosition, CaptureBackend, DeviceInput, DeviceKind, FinishNotifier,
    PermissionGateway, PermissionKind, PermissionState, PermissionStatus, PreviewSurface,
    RecordingFinished,
};
use crate::config::CaptureConfig;
use crate::storage::StorageSink;
use crate::utils::time::fractional_timestamp;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Preview surfaces, one per camera
#[derive(Clone)]
pub struct PreviewPair {
    pub front: Arc<dyn PreviewSurface>,
    pub back: Arc<dyn PreviewSurface>,
}

impl PreviewPair {
    fn surface(&self, position: CameraPosition) -> &Arc<dyn PreviewSurface> {
        match position {
            CameraPosition::Front => &self.front,
            CameraPosition::Back => &self.back,
        }
    }
}

/// Main and PiP rectangles supplied by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewBounds {
    pub main: Bounds,
    pub pip: Bounds,
}

/// Coordinates one capture session, two cameras and one recording output
pub struct CaptureSessionCoordinator {
    config: CaptureConfig,

    /// Current state, shared read-only with handles
    state: Arc<RwLock<CoordinatorState>>,

    permissions: PermissionState,

    backend: Box<dyn CaptureBackend>,
    gateway: Arc<dyn PermissionGateway>,
    storage: Arc<dyn StorageSink>,
    previews: PreviewPair,
    preview_bounds: Option<PreviewBounds>,

    /// Surfaces currently bound to the session
    attached: Vec<CameraPosition>,

    front_input: Option<DeviceInput>,
    back_input: Option<DeviceInput>,
    audio_input: Option<DeviceInput>,
    has_movie_output: bool,

    active: CameraPosition,

    /// Recording in flight, kept until its file has been handed off
    recording: Option<RecordingSession>,
    last_recording_at: Option<DateTime<Utc>>,

    finish_tx: FinishNotifier,
    event_tx: broadcast::Sender<CoordinatorEvent>,
}

impl CaptureSessionCoordinator {
    pub fn new(
        config: CaptureConfig,
        backend: Box<dyn CaptureBackend>,
        gateway: Arc<dyn PermissionGateway>,
        storage: Arc<dyn StorageSink>,
        previews: PreviewPair,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        // Replaced by `finish_reports`; until then reports go nowhere
        let (finish_tx, _) = mpsc::unbounded_channel();
        Self {
            config,
            state: Arc::new(RwLock::new(CoordinatorState::Idle)),
            permissions: PermissionState::default(),
            backend,
            gateway,
            storage,
            previews,
            preview_bounds: None,
            attached: Vec::new(),
            front_input: None,
            back_input: None,
            audio_input: None,
            has_movie_output: false,
            active: CameraPosition::Front,
            recording: None,
            last_recording_at: None,
            finish_tx,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> CoordinatorState {
        *self.state.read()
    }

    /// Shared, read-only view of the state
    pub fn state_handle(&self) -> Arc<RwLock<CoordinatorState>> {
        self.state.clone()
    }

    pub fn permissions(&self) -> PermissionState {
        self.permissions
    }

    pub fn active_camera(&self) -> CameraPosition {
        self.active
    }

    pub fn layout(&self) -> PreviewLayout {
        PreviewLayout::for_active(self.active)
    }

    pub fn recording(&self) -> Option<&RecordingSession> {
        self.recording.as_ref()
    }

    pub fn is_recording(&self) -> bool {
        self.state() == CoordinatorState::Recording
    }

    /// Camera switching is only offered while the session runs idle
    pub fn is_switch_enabled(&self) -> bool {
        self.state() == CoordinatorState::SessionRunning
    }

    /// Subscribe to coordinator events
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.event_tx.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<CoordinatorEvent> {
        self.event_tx.clone()
    }

    /// Channel on which the platform reports finished recordings.
    ///
    /// Each call opens a new channel; recordings started afterwards report
    /// on it. The receiver must be fed back into
    /// [`on_recording_finished`](Self::on_recording_finished).
    pub fn finish_reports(&mut self) -> mpsc::UnboundedReceiver<RecordingFinished> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.finish_tx = tx;
        rx
    }

    /// Set the main and PiP preview rectangles
    pub fn set_preview_bounds(&mut self, main: Bounds, pip: Bounds) {
        self.preview_bounds = Some(PreviewBounds { main, pip });
        self.apply_layout();
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.event_tx.send(event);
    }

    fn status(&self, status: StatusMessage) {
        self.emit(CoordinatorEvent::Status { status });
    }

    fn set_state(&self, next: CoordinatorState) {
        let previous = {
            let mut state = self.state.write();
            if state.is_failed() {
                return;
            }
            std::mem::replace(&mut *state, next)
        };
        if previous != next {
            tracing::debug!("Capture state: {} -> {}", previous, next);
            self.emit(CoordinatorEvent::StateChanged { state: next });
        }
    }

    /// Enter the absorbing failed state and report it persistently
    fn fail(&mut self, reason: FailureReason) -> CaptureError {
        tracing::error!("Capture failed: {}", reason);
        self.set_state(CoordinatorState::Failed(reason));
        let text = match reason {
            FailureReason::PermissionDenied(kind) => {
                format!("{} access denied. {}", kind, kind.remediation())
            }
            FailureReason::DeviceUnavailable(kind) => format!("{} error", capitalize(&kind.to_string())),
            FailureReason::SessionStartFailed => "Camera failed".to_string(),
        };
        self.status(StatusMessage::persistent(text));
        self.emit(CoordinatorEvent::SwitchEnabled { enabled: false });
        reason.into()
    }

    /// Reject an operation unless the state is one of `allowed`
    fn expect_state(&self, operation: &'static str, allowed: &[CoordinatorState]) -> CaptureResult<()> {
        let state = self.state();
        if let CoordinatorState::Failed(reason) = state {
            return Err(reason.into());
        }
        if !allowed.contains(&state) {
            tracing::debug!("Rejected {}: state is {}", operation, state);
            return Err(CaptureError::InvalidState { operation, state });
        }
        Ok(())
    }

    /// Request camera then microphone access and configure the session
    pub async fn prepare(&mut self) -> CaptureResult<()> {
        self.request_permissions().await?;
        self.configure_session().await
    }

    /// Ask for camera access, then (only if granted) microphone access.
    ///
    /// Answers are one-shot: a kind that has already been answered is never
    /// asked again.
    pub async fn request_permissions(&mut self) -> CaptureResult<()> {
        self.expect_state("request permissions", &[CoordinatorState::Idle])?;
        self.set_state(CoordinatorState::PermissionsPending);

        for kind in [PermissionKind::Camera, PermissionKind::Microphone] {
            if !self.permissions.get(kind).is_resolved() {
                self.status(StatusMessage::info(format!("Requesting {} permission...", kind.name().to_lowercase())));
                let granted = match kind {
                    PermissionKind::Camera => self.gateway.request_camera_access().await,
                    PermissionKind::Microphone => self.gateway.request_microphone_access().await,
                };
                tracing::info!("{} permission {}", kind, if granted { "granted" } else { "denied" });
                self.permissions.resolve(kind, granted);
            }
            if self.permissions.get(kind) != PermissionStatus::Granted {
                return Err(self.fail(FailureReason::PermissionDenied(kind)));
            }
        }

        Ok(())
    }

    fn acquire(&mut self, kind: DeviceKind) -> CaptureResult<DeviceInput> {
        match self.backend.acquire_input(kind) {
            Ok(input) => Ok(input),
            Err(e) => {
                tracing::warn!("Could not acquire {}: {}", kind, e);
                Err(self.fail(FailureReason::DeviceUnavailable(kind)))
            }
        }
    }

    fn install(&mut self, input: &DeviceInput) -> Result<(), DeviceKind> {
        if !self.backend.can_add_input(input) {
            return Err(input.kind);
        }
        self.backend.add_input(input).map_err(|e| {
            tracing::warn!("Could not add {}: {}", input.kind, e);
            input.kind
        })
    }

    /// Remove every installed input inside one transaction
    fn remove_all_inputs(&mut self) {
        let inputs = self.backend.inputs();
        if inputs.is_empty() {
            return;
        }
        self.backend.begin_configuration();
        for input in &inputs {
            self.backend.remove_input(input);
        }
        self.backend.commit_configuration();
    }

    /// Build the pipeline: front camera and microphone installed, back
    /// camera held ready, movie output added, then start it running.
    pub async fn configure_session(&mut self) -> CaptureResult<()> {
        self.expect_state(
            "configure the session",
            &[CoordinatorState::Idle, CoordinatorState::PermissionsPending],
        )?;
        if !self.permissions.all_granted() {
            if let Some(kind) = self.permissions.first_denied() {
                return Err(CaptureError::PermissionDenied(kind));
            }
            return Err(CaptureError::InvalidState {
                operation: "configure the session before permissions are granted",
                state: self.state(),
            });
        }

        self.set_state(CoordinatorState::SessionConfiguring);
        self.status(StatusMessage::info("Setting up camera..."));

        if let Err(e) = tokio::fs::create_dir_all(&self.config.recordings_dir).await {
            tracing::error!("Could not create {:?}: {}", self.config.recordings_dir, e);
            return Err(self.fail(FailureReason::SessionStartFailed));
        }

        let front = self.acquire(DeviceKind::FrontCamera)?;
        let back = self.acquire(DeviceKind::BackCamera)?;
        let audio = self.acquire(DeviceKind::Microphone)?;

        self.backend.begin_configuration();
        let installed = self.install(&front).and_then(|_| self.install(&audio));
        if let Err(kind) = installed {
            for input in self.backend.inputs() {
                self.backend.remove_input(&input);
            }
            self.backend.commit_configuration();
            return Err(self.fail(FailureReason::DeviceUnavailable(kind)));
        }
        if !self.has_movie_output {
            if let Err(e) = self.backend.add_movie_output() {
                tracing::warn!("Could not add movie output: {}", e);
                for input in self.backend.inputs() {
                    self.backend.remove_input(&input);
                }
                self.backend.commit_configuration();
                return Err(self.fail(FailureReason::SessionStartFailed));
            }
            self.has_movie_output = true;
        }
        self.backend.commit_configuration();
        tracing::info!("Capture session configured with front camera and microphone");

        self.front_input = Some(front);
        self.back_input = Some(back);
        self.audio_input = Some(audio);
        self.active = CameraPosition::Front;

        // The back surface stays unbound until its camera is swapped in
        self.attach_preview(CameraPosition::Front);
        self.apply_layout();

        if !self.backend.start_running().await {
            self.release_session();
            return Err(self.fail(FailureReason::SessionStartFailed));
        }

        tracing::info!("Capture session started");
        self.set_state(CoordinatorState::SessionRunning);
        self.status(StatusMessage::success("Camera ready"));
        self.emit(CoordinatorEvent::CameraSwitched { layout: self.layout() });
        self.emit(CoordinatorEvent::SwitchEnabled { enabled: true });
        Ok(())
    }

    fn attach_preview(&mut self, position: CameraPosition) {
        if !self.attached.contains(&position) {
            self.previews.surface(position).attach(self.backend.session_id());
            self.attached.push(position);
        }
    }

    fn apply_layout(&self) {
        if let Some(bounds) = self.preview_bounds {
            self.previews.surface(self.active).resize(bounds.main);
            self.previews.surface(self.active.other()).resize(bounds.pip);
        }
    }

    fn input_for(&self, position: CameraPosition) -> Option<DeviceInput> {
        match position {
            CameraPosition::Front => self.front_input.clone(),
            CameraPosition::Back => self.back_input.clone(),
        }
    }

    /// Swap which camera feeds the session.
    ///
    /// Runs as one transaction: remove the active camera, add the other. If
    /// the other camera is refused the previous one is put back and the
    /// switch reports `CameraSwitchFailed`. Rejected while recording.
    pub fn switch_active_camera(&mut self) -> CaptureResult<CameraPosition> {
        self.expect_state("switch cameras", &[CoordinatorState::SessionRunning])?;

        let from = self.active;
        let to = from.other();
        let (Some(current), Some(target)) = (self.input_for(from), self.input_for(to)) else {
            return Err(CaptureError::InvalidState {
                operation: "switch cameras without both cameras",
                state: self.state(),
            });
        };

        tracing::info!("Switching cameras: {} -> {}", from, to);
        self.backend.begin_configuration();
        self.backend.remove_input(&current);
        if self.install(&target).is_err() {
            let restored = self.install(&current).is_ok();
            self.backend.commit_configuration();
            if restored {
                tracing::warn!("{} camera refused, kept {} camera", to, from);
                self.status(StatusMessage::transient(format!("Could not switch to the {} camera", to)));
                return Err(CaptureError::CameraSwitchFailed(to));
            }
            tracing::error!("Lost both cameras while switching");
            self.release_session();
            return Err(self.fail(FailureReason::DeviceUnavailable(DeviceKind::camera(from))));
        }
        self.backend.commit_configuration();

        self.active = to;
        self.attach_preview(to);
        self.apply_layout();
        self.emit(CoordinatorEvent::CameraSwitched { layout: self.layout() });
        Ok(to)
    }

    /// `pip_video_{camera}_{timestamp}.mov`, with the timestamp kept
    /// strictly increasing across recordings
    fn next_recording_path(&mut self) -> PathBuf {
        let mut at = Utc::now();
        if let Some(last) = self.last_recording_at {
            if at <= last {
                at = last + ChronoDuration::microseconds(1);
            }
        }
        self.last_recording_at = Some(at);
        let name = format!("pip_video_{}_{}.mov", self.active.label(), fractional_timestamp(at));
        self.config.recordings_dir.join(name)
    }

    /// Begin recording the active camera to a fresh file
    pub fn start_recording(&mut self) -> CaptureResult<PathBuf> {
        self.expect_state("start recording", &[CoordinatorState::SessionRunning])?;
        if !self.backend.is_running() {
            return Err(CaptureError::SessionNotRunning);
        }
        if self.recording.is_some() {
            return Err(CaptureError::RecordingInProgress);
        }

        let path = self.next_recording_path();
        if let Err(e) = self.backend.start_recording(&path, self.finish_tx.clone()) {
            tracing::error!("Could not start recording: {}", e);
            self.status(StatusMessage::transient("Recording setup error"));
            return Err(CaptureError::RecordingFailed(e));
        }

        tracing::info!("Started recording to {:?}", path);
        self.recording = Some(RecordingSession::new(path.clone(), self.active));
        self.set_state(CoordinatorState::Recording);
        self.emit(CoordinatorEvent::SwitchEnabled { enabled: false });
        self.emit(CoordinatorEvent::RecordingStarted {
            path: path.clone(),
            camera: self.active,
        });
        self.emit(CoordinatorEvent::Progress {
            elapsed_secs: 0,
            remaining_secs: self.config.max_recording_secs,
        });
        self.status(StatusMessage::info(format!(
            "Recording PiP video (max {} seconds)",
            self.config.max_recording_secs
        )));
        Ok(path)
    }

    /// Advance the recording clock by one tick. Stops the recording when the
    /// cap is reached. Returns the elapsed seconds, or `None` if no
    /// recording is counting.
    pub fn on_timer_tick(&mut self) -> Option<u32> {
        if !self.is_recording() {
            return None;
        }
        let max = self.config.max_recording_secs;
        let session = self.recording.as_mut().filter(|s| !s.stop_requested)?;
        session.elapsed_secs += 1;
        let elapsed = session.elapsed_secs;

        self.emit(CoordinatorEvent::Progress {
            elapsed_secs: elapsed,
            remaining_secs: max.saturating_sub(elapsed),
        });

        if elapsed >= max {
            tracing::info!("Recording reached {}, stopping", format_elapsed(elapsed));
            if let Err(e) = self.stop_recording() {
                tracing::warn!("Auto-stop failed: {}", e);
            }
        }
        Some(elapsed)
    }

    /// Ask the platform to stop recording.
    ///
    /// Switching is re-enabled right away; the file is handled when the
    /// finish report arrives.
    pub fn stop_recording(&mut self) -> CaptureResult<()> {
        self.expect_state("stop recording", &[CoordinatorState::Recording])?;
        let elapsed_secs = match self.recording.as_mut() {
            Some(session) => {
                session.stop_requested = true;
                session.elapsed_secs
            }
            None => 0,
        };

        self.backend.stop_recording();
        tracing::info!("Stopped recording after {}", format_elapsed(elapsed_secs));

        self.set_state(CoordinatorState::SessionRunning);
        self.emit(CoordinatorEvent::SwitchEnabled { enabled: true });
        self.emit(CoordinatorEvent::RecordingStopped { elapsed_secs });
        self.status(StatusMessage::info("Saving video..."));
        Ok(())
    }

    /// Handle the platform's report that a recording has ended.
    ///
    /// A clean file goes to storage; an error is reported and nothing is
    /// stored. Either way the coordinator is ready for a new recording
    /// afterwards.
    pub async fn on_recording_finished(&mut self, finished: RecordingFinished) -> CaptureResult<PathBuf> {
        let RecordingFinished { file, error } = finished;
        match &self.recording {
            Some(session) if session.output_file == file => {}
            Some(session) => {
                tracing::warn!(
                    "Ignoring finish report for {:?} while {:?} is in flight",
                    file,
                    session.output_file
                );
                return Err(CaptureError::UnexpectedFinish(file));
            }
            None => {
                tracing::warn!("Ignoring finish report for {:?} without an active recording", file);
                return Err(CaptureError::UnexpectedFinish(file));
            }
        }

        // The platform ended the recording on its own
        if self.is_recording() {
            tracing::warn!("Recording ended without a stop request");
            self.set_state(CoordinatorState::SessionRunning);
            self.emit(CoordinatorEvent::SwitchEnabled { enabled: true });
        }

        let result = match error {
            Some(error) => {
                tracing::error!("Recording error: {}", error);
                Err(CaptureError::RecordingFailed(error))
            }
            None => self.storage.save(&file).await.map_err(|e| {
                tracing::error!("Error saving video: {}", e);
                CaptureError::StorageFailed(e.to_string())
            }),
        };
        self.recording = None;

        match &result {
            Ok(path) => {
                self.emit(CoordinatorEvent::RecordingSaved { path: path.clone() });
                self.status(StatusMessage::success("Video saved!"));
            }
            Err(e) => {
                self.emit(CoordinatorEvent::RecordingFailed { reason: e.to_string() });
                let text = match e {
                    CaptureError::StorageFailed(_) => "Save failed, try recording again",
                    _ => "Recording failed, try again",
                };
                self.status(StatusMessage::transient(text));
            }
        }
        result
    }

    /// Stop everything and let go of the session.
    ///
    /// An in-flight recording is stopped first. A failed coordinator
    /// releases its resources but stays failed.
    pub fn teardown(&mut self) {
        if self.is_recording() {
            let _ = self.stop_recording();
        }
        self.release_session();
        self.set_state(CoordinatorState::Idle);
        tracing::info!("Capture session torn down");
    }

    fn release_session(&mut self) {
        if self.backend.is_running() {
            self.backend.stop_running();
        }
        self.remove_all_inputs();
        self.front_input = None;
        self.back_input = None;
        self.audio_input = None;
        self.active = CameraPosition::Front;
        for position in std::mem::take(&mut self.attached) {
            self.previews.surface(position).detach();
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::simulated::{SimulatedBackend, SimulatedPermissions, SimulatedPreview};
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// Storage double that records every save
    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    #[async_trait]
    impl StorageSink for RecordingSink {
        async fn save(&self, source: &Path) -> StorageResult<PathBuf> {
            self.saved.lock().push(source.to_path_buf());
            if self.fail {
                Err(StorageError::Task("disk full".to_string()))
            } else {
                Ok(source.with_file_name("video_1.000000.mov"))
            }
        }
    }

    struct Harness {
        coordinator: CaptureSessionCoordinator,
        backend: SimulatedBackend,
        gateway: Arc<SimulatedPermissions>,
        sink: Arc<RecordingSink>,
        front: Arc<SimulatedPreview>,
        back: Arc<SimulatedPreview>,
        finished: mpsc::UnboundedReceiver<RecordingFinished>,
        _dir: TempDir,
    }

    fn harness_with(gateway: SimulatedPermissions, sink: RecordingSink) -> Harness {
        let dir = tempdir().unwrap();
        let config = CaptureConfig {
            recordings_dir: dir.path().to_path_buf(),
            ..CaptureConfig::default()
        };
        let backend = SimulatedBackend::new();
        let gateway = Arc::new(gateway);
        let sink = Arc::new(sink);
        let front = Arc::new(SimulatedPreview::new());
        let back = Arc::new(SimulatedPreview::new());
        let previews = PreviewPair {
            front: front.clone(),
            back: back.clone(),
        };
        let mut coordinator = CaptureSessionCoordinator::new(
            config,
            Box::new(backend.clone()),
            gateway.clone(),
            sink.clone(),
            previews,
        );
        let finished = coordinator.finish_reports();
        Harness {
            coordinator,
            backend,
            gateway,
            sink,
            front,
            back,
            finished,
            _dir: dir,
        }
    }

    fn harness() -> Harness {
        harness_with(SimulatedPermissions::granted(), RecordingSink::default())
    }

    /// Every input change so far went through a configuration transaction
    fn assert_bracketed(h: &Harness) {
        let session = h.backend.session();
        let session = session.lock();
        assert_eq!(session.unbracketed_changes, 0);
        assert_eq!(session.config_depth, 0);
    }

    async fn running() -> Harness {
        let mut h = harness();
        h.coordinator.prepare().await.unwrap();
        h
    }

    #[tokio::test]
    async fn test_prepare_reaches_running_with_front_and_mic() {
        let h = running().await;
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
        assert_eq!(h.coordinator.active_camera(), CameraPosition::Front);

        let session = h.backend.session();
        let session = session.lock();
        assert_eq!(session.video_inputs(), vec![DeviceKind::FrontCamera]);
        assert!(session.inputs.iter().any(|i| i.kind == DeviceKind::Microphone));
        assert!(session.has_movie_output);
        assert_eq!(session.config_depth, 0);
        assert_eq!(session.unbracketed_changes, 0);

        assert_eq!(h.front.attached_to(), Some(h.backend.session_id()));
        assert_eq!(h.back.attached_to(), None);
    }

    #[tokio::test]
    async fn test_camera_denied_never_asks_for_microphone() {
        let mut h = harness_with(SimulatedPermissions::new(false, true), RecordingSink::default());

        let result = h.coordinator.prepare().await;
        assert_eq!(result, Err(CaptureError::PermissionDenied(PermissionKind::Camera)));
        assert_eq!(
            h.coordinator.state(),
            CoordinatorState::Failed(FailureReason::PermissionDenied(PermissionKind::Camera))
        );
        assert_eq!(h.gateway.camera_requests(), 1);
        assert_eq!(h.gateway.microphone_requests(), 0);
    }

    #[tokio::test]
    async fn test_microphone_denied_fails() {
        let mut h = harness_with(SimulatedPermissions::new(true, false), RecordingSink::default());

        assert!(h.coordinator.prepare().await.is_err());
        assert_eq!(
            h.coordinator.state(),
            CoordinatorState::Failed(FailureReason::PermissionDenied(PermissionKind::Microphone))
        );
        assert!(h.backend.inputs().is_empty());
    }

    #[tokio::test]
    async fn test_failed_state_is_absorbing() {
        let mut h = harness_with(SimulatedPermissions::new(false, true), RecordingSink::default());
        let _ = h.coordinator.prepare().await;

        assert!(h.coordinator.request_permissions().await.is_err());
        assert!(h.coordinator.start_recording().is_err());
        h.coordinator.teardown();
        assert!(h.coordinator.state().is_failed());
        assert_eq!(h.gateway.camera_requests(), 1);
    }

    #[tokio::test]
    async fn test_missing_back_camera_leaves_no_inputs() {
        let mut h = harness();
        h.backend.session().lock().missing_devices.insert(DeviceKind::BackCamera);

        let result = h.coordinator.prepare().await;
        assert_eq!(result, Err(CaptureError::DeviceUnavailable(DeviceKind::BackCamera)));
        assert_eq!(
            h.coordinator.state(),
            CoordinatorState::Failed(FailureReason::DeviceUnavailable(DeviceKind::BackCamera))
        );
        assert!(h.backend.inputs().is_empty());
        assert!(!h.backend.is_running());
        assert_bracketed(&h);
    }

    #[tokio::test]
    async fn test_refused_microphone_rolls_back_front_camera() {
        let mut h = harness();
        h.backend.session().lock().refused_devices.insert(DeviceKind::Microphone);

        let result = h.coordinator.prepare().await;
        assert_eq!(result, Err(CaptureError::DeviceUnavailable(DeviceKind::Microphone)));
        let session = h.backend.session();
        let session = session.lock();
        assert!(session.inputs.is_empty());
        assert_eq!(session.config_depth, 0);
        assert_eq!(session.unbracketed_changes, 0);
    }

    #[tokio::test]
    async fn test_session_that_never_runs_fails() {
        let mut h = harness();
        h.backend.session().lock().fail_start = true;

        let result = h.coordinator.prepare().await;
        assert_eq!(result, Err(CaptureError::SessionStartFailed));
        assert!(h.backend.inputs().is_empty());
        assert_eq!(h.front.attached_to(), None);
        assert_bracketed(&h);
    }

    #[tokio::test]
    async fn test_start_recording_rejected_before_running() {
        let mut h = harness();
        let result = h.coordinator.start_recording();
        assert!(matches!(result, Err(CaptureError::InvalidState { .. })));
        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);

        h.coordinator.request_permissions().await.unwrap();
        assert!(h.coordinator.start_recording().is_err());
        assert_eq!(h.coordinator.state(), CoordinatorState::PermissionsPending);
        assert_eq!(h.backend.session().lock().recordings_started, 0);
    }

    #[tokio::test]
    async fn test_start_recording_requires_live_session() {
        let mut h = running().await;
        h.backend.session().lock().running = false;

        assert_eq!(h.coordinator.start_recording(), Err(CaptureError::SessionNotRunning));
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
    }

    #[tokio::test]
    async fn test_switches_never_install_two_cameras() {
        let mut h = running().await;
        for expected in [CameraPosition::Back, CameraPosition::Front, CameraPosition::Back] {
            assert_eq!(h.coordinator.switch_active_camera().unwrap(), expected);
            assert!(h.backend.session().lock().video_inputs().len() <= 1);
        }
        let session = h.backend.session();
        let session = session.lock();
        assert_eq!(session.max_video_inputs, 1);
        assert_eq!(session.video_inputs(), vec![DeviceKind::BackCamera]);
        assert_eq!(session.unbracketed_changes, 0);
    }

    #[tokio::test]
    async fn test_switch_attaches_back_preview_and_swaps_bounds() {
        let mut h = running().await;
        let main = Bounds::new(0.0, 0.0, 390.0, 700.0);
        let pip = Bounds::new(250.0, 40.0, 120.0, 160.0);
        h.coordinator.set_preview_bounds(main, pip);
        assert_eq!(h.front.bounds(), Some(main));

        h.coordinator.switch_active_camera().unwrap();
        assert_eq!(h.back.attached_to(), Some(h.backend.session_id()));
        assert_eq!(h.back.bounds(), Some(main));
        assert_eq!(h.front.bounds(), Some(pip));
        assert_eq!(h.coordinator.layout(), PreviewLayout::for_active(CameraPosition::Back));
    }

    #[tokio::test]
    async fn test_switch_during_recording_is_rejected() {
        let mut h = running().await;
        h.coordinator.start_recording().unwrap();
        let transactions = h.backend.session().lock().transactions;

        let result = h.coordinator.switch_active_camera();
        assert!(matches!(result, Err(CaptureError::InvalidState { .. })));
        assert_eq!(h.coordinator.active_camera(), CameraPosition::Front);
        assert_eq!(h.backend.session().lock().transactions, transactions);
    }

    #[tokio::test]
    async fn test_refused_switch_restores_previous_camera() {
        let mut h = running().await;
        h.backend.session().lock().refused_devices.insert(DeviceKind::BackCamera);

        let result = h.coordinator.switch_active_camera();
        assert_eq!(result, Err(CaptureError::CameraSwitchFailed(CameraPosition::Back)));
        assert_eq!(h.coordinator.active_camera(), CameraPosition::Front);
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
        assert_eq!(h.backend.session().lock().video_inputs(), vec![DeviceKind::FrontCamera]);
        assert_bracketed(&h);
    }

    #[tokio::test]
    async fn test_switch_losing_both_cameras_fails() {
        let mut h = running().await;
        {
            let session = h.backend.session();
            let mut session = session.lock();
            session.refused_devices.insert(DeviceKind::BackCamera);
            session.refused_devices.insert(DeviceKind::FrontCamera);
        }

        let result = h.coordinator.switch_active_camera();
        assert_eq!(result, Err(CaptureError::DeviceUnavailable(DeviceKind::FrontCamera)));
        assert!(h.coordinator.state().is_failed());
        assert!(!h.backend.is_running());
        assert_bracketed(&h);
    }

    #[tokio::test]
    async fn test_recording_path_names_camera() {
        let mut h = running().await;
        h.coordinator.switch_active_camera().unwrap();

        let path = h.coordinator.start_recording().unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("pip_video_back_"));
        assert!(name.ends_with(".mov"));
        assert_eq!(h.coordinator.recording().unwrap().camera, CameraPosition::Back);
    }

    #[tokio::test]
    async fn test_auto_stop_fires_exactly_once_at_cap() {
        let mut h = running().await;
        h.coordinator.start_recording().unwrap();

        for tick in 1..15 {
            assert_eq!(h.coordinator.on_timer_tick(), Some(tick));
            assert_eq!(h.backend.session().lock().recordings_stopped, 0);
        }
        assert_eq!(h.coordinator.on_timer_tick(), Some(15));
        assert_eq!(h.backend.session().lock().recordings_stopped, 1);
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);

        assert_eq!(h.coordinator.on_timer_tick(), None);
        assert_eq!(h.backend.session().lock().recordings_stopped, 1);
    }

    #[tokio::test]
    async fn test_stop_reenables_switching_before_finish() {
        let mut h = running().await;
        h.coordinator.start_recording().unwrap();
        assert!(!h.coordinator.is_switch_enabled());

        h.coordinator.stop_recording().unwrap();
        assert!(h.coordinator.is_switch_enabled());
        assert!(h.coordinator.recording().is_some());
        assert_eq!(
            h.coordinator.start_recording(),
            Err(CaptureError::RecordingInProgress)
        );
    }

    #[tokio::test]
    async fn test_clean_finish_is_saved_once() {
        let mut h = running().await;
        let path = h.coordinator.start_recording().unwrap();
        h.coordinator.stop_recording().unwrap();

        let report = h.finished.recv().await.unwrap();
        assert_eq!(report.file, path);
        let saved = h.coordinator.on_recording_finished(report).await.unwrap();

        assert_eq!(saved.file_name().unwrap(), "video_1.000000.mov");
        assert_eq!(*h.sink.saved.lock(), vec![path]);
        assert!(h.coordinator.recording().is_none());
        assert!(h.coordinator.start_recording().is_ok());
    }

    #[tokio::test]
    async fn test_repeated_finish_report_is_saved_once() {
        let mut h = running().await;
        let path = h.coordinator.start_recording().unwrap();
        h.coordinator.stop_recording().unwrap();

        let report = h.finished.recv().await.unwrap();
        h.coordinator.on_recording_finished(report.clone()).await.unwrap();

        let again = h.coordinator.on_recording_finished(report).await;
        assert_eq!(again, Err(CaptureError::UnexpectedFinish(path.clone())));
        assert_eq!(*h.sink.saved.lock(), vec![path]);
    }

    #[tokio::test]
    async fn test_report_for_another_file_is_ignored() {
        let mut h = running().await;
        let path = h.coordinator.start_recording().unwrap();
        let stray = path.with_file_name("pip_video_front_1.000000.mov");

        let result = h
            .coordinator
            .on_recording_finished(RecordingFinished {
                file: stray.clone(),
                error: None,
            })
            .await;

        assert_eq!(result, Err(CaptureError::UnexpectedFinish(stray)));
        assert!(h.sink.saved.lock().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::Recording);
        assert_eq!(h.coordinator.recording().unwrap().output_file, path);
    }

    #[tokio::test]
    async fn test_back_to_back_recordings_get_distinct_paths() {
        let mut h = running().await;
        let mut paths = Vec::new();
        for _ in 0..3 {
            paths.push(h.coordinator.start_recording().unwrap());
            h.coordinator.stop_recording().unwrap();
            let report = h.finished.recv().await.unwrap();
            h.coordinator.on_recording_finished(report).await.unwrap();
        }
        assert!(paths.windows(2).all(|w| w[0] != w[1]));
    }

    #[tokio::test]
    async fn test_prepare_creates_recordings_dir() {
        let mut h = harness();
        let nested = h._dir.path().join("nested").join("recordings");
        h.coordinator.config.recordings_dir = nested.clone();

        h.coordinator.prepare().await.unwrap();
        assert!(nested.is_dir());
        let path = h.coordinator.start_recording().unwrap();
        assert_eq!(path.parent(), Some(nested.as_path()));
    }

    #[tokio::test]
    async fn test_failed_recording_is_never_saved() {
        let mut h = running().await;
        h.coordinator.start_recording().unwrap();
        h.backend.session().lock().recording_error = Some("encoder error".to_string());
        h.coordinator.stop_recording().unwrap();

        let report = h.finished.recv().await.unwrap();
        let result = h.coordinator.on_recording_finished(report).await;

        assert_eq!(result, Err(CaptureError::RecordingFailed("encoder error".to_string())));
        assert!(h.sink.saved.lock().is_empty());
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
    }

    #[tokio::test]
    async fn test_storage_failure_is_recoverable() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut h = harness_with(SimulatedPermissions::granted(), sink);
        h.coordinator.prepare().await.unwrap();
        h.coordinator.start_recording().unwrap();
        h.coordinator.stop_recording().unwrap();

        let report = h.finished.recv().await.unwrap();
        let result = h.coordinator.on_recording_finished(report).await;

        assert!(matches!(result, Err(CaptureError::StorageFailed(_))));
        assert!(result.unwrap_err().is_recoverable());
        assert!(h.coordinator.start_recording().is_ok());
    }

    #[tokio::test]
    async fn test_interruption_returns_to_running() {
        let mut h = running().await;
        h.coordinator.start_recording().unwrap();
        h.backend.interrupt("phone call");

        let report = h.finished.recv().await.unwrap();
        assert!(h.coordinator.on_recording_finished(report).await.is_err());
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
        assert!(h.sink.saved.lock().is_empty());
    }

    #[tokio::test]
    async fn test_teardown_releases_session_and_previews() {
        let mut h = running().await;
        h.coordinator.switch_active_camera().unwrap();
        h.coordinator.start_recording().unwrap();

        h.coordinator.teardown();

        assert_eq!(h.coordinator.state(), CoordinatorState::Idle);
        assert_eq!(h.backend.session().lock().recordings_stopped, 1);
        assert!(!h.backend.is_running());
        assert!(h.backend.inputs().is_empty());
        assert_eq!(h.front.attached_to(), None);
        assert_eq!(h.back.attached_to(), None);
        assert_bracketed(&h);
    }

    #[tokio::test]
    async fn test_prepare_after_teardown_skips_prompts() {
        let mut h = running().await;
        h.coordinator.teardown();

        h.coordinator.prepare().await.unwrap();
        assert_eq!(h.coordinator.state(), CoordinatorState::SessionRunning);
        assert_eq!(h.gateway.camera_requests(), 1);
        assert_eq!(h.gateway.microphone_requests(), 1);
    }

    #[tokio::test]
    async fn test_events_report_state_changes() {
        let mut h = harness();
        let mut events = h.coordinator.subscribe();
        h.coordinator.prepare().await.unwrap();

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let CoordinatorEvent::StateChanged { state } = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![
                CoordinatorState::PermissionsPending,
                CoordinatorState::SessionConfiguring,
                CoordinatorState::SessionRunning,
            ]
        );
    }
}
