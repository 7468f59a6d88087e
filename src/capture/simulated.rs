//! In-memory capture platform
//!
//! Stands in for the platform media framework on hosts without camera
//! hardware. Every component exposes its recorded activity so callers can
//! check what the coordinator did to the session.

use super::traits::{
    Bounds, CaptureBackend, DeviceInput, DeviceKind, FinishNotifier, PermissionGateway,
    PreviewSurface, RecordingFinished, SessionId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Observable state of a [`SimulatedBackend`]
#[derive(Debug, Default)]
pub struct SimulatedSession {
    /// Devices reported absent by `acquire_input`
    pub missing_devices: HashSet<DeviceKind>,

    /// Devices whose inputs are refused by `add_input`
    pub refused_devices: HashSet<DeviceKind>,

    /// Make `start_running` report a pipeline that did not come up
    pub fail_start: bool,

    /// Error to report for the next finished recording
    pub recording_error: Option<String>,

    pub inputs: Vec<DeviceInput>,
    pub has_movie_output: bool,
    pub running: bool,
    pub config_depth: u32,
    pub transactions: u32,

    /// Input changes made outside `begin_configuration`/`commit_configuration`
    pub unbracketed_changes: u32,
    pub max_video_inputs: usize,
    pub recording_path: Option<PathBuf>,
    pub recordings_started: u32,
    pub recordings_stopped: u32,
    notifier: Option<FinishNotifier>,
}

impl SimulatedSession {
    pub fn video_inputs(&self) -> Vec<DeviceKind> {
        self.inputs
            .iter()
            .filter(|input| input.kind.is_video())
            .map(|input| input.kind)
            .collect()
    }
}

/// Capture backend that keeps its pipeline in memory
///
/// Stopping a recording writes a small placeholder movie file and reports
/// completion through the notifier, like a real platform would.
#[derive(Clone)]
pub struct SimulatedBackend {
    id: SessionId,
    session: Arc<Mutex<SimulatedSession>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            session: Arc::new(Mutex::new(SimulatedSession::default())),
        }
    }

    /// Shared view of the session for inspection and fault injection
    pub fn session(&self) -> Arc<Mutex<SimulatedSession>> {
        self.session.clone()
    }

    /// Report an interruption that aborts the active recording
    pub fn interrupt(&self, reason: &str) {
        let mut session = self.session.lock();
        if let (Some(path), Some(notifier)) = (session.recording_path.take(), session.notifier.take()) {
            tracing::warn!("Simulated recording interrupted: {}", reason);
            let _ = notifier.send(RecordingFinished {
                file: path,
                error: Some(reason.to_string()),
            });
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for SimulatedBackend {
    fn session_id(&self) -> SessionId {
        self.id
    }

    fn acquire_input(&self, kind: DeviceKind) -> Result<DeviceInput, String> {
        if self.session.lock().missing_devices.contains(&kind) {
            return Err(format!("no {} present", kind));
        }
        let device_id = match kind {
            DeviceKind::FrontCamera => "sim.camera.front",
            DeviceKind::BackCamera => "sim.camera.back",
            DeviceKind::Microphone => "sim.microphone",
        };
        Ok(DeviceInput::new(device_id, kind))
    }

    fn begin_configuration(&mut self) {
        self.session.lock().config_depth += 1;
    }

    fn commit_configuration(&mut self) {
        let mut session = self.session.lock();
        session.config_depth = session.config_depth.saturating_sub(1);
        session.transactions += 1;
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let session = self.session.lock();
        if session.refused_devices.contains(&input.kind) || session.inputs.contains(input) {
            return false;
        }
        // One video input at a time
        !(input.kind.is_video() && session.inputs.iter().any(|i| i.kind.is_video()))
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), String> {
        if !self.can_add_input(input) {
            return Err(format!("session refused {}", input.kind));
        }
        let mut session = self.session.lock();
        if session.config_depth == 0 {
            session.unbracketed_changes += 1;
        }
        session.inputs.push(input.clone());
        let video = session.video_inputs().len();
        session.max_video_inputs = session.max_video_inputs.max(video);
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        let mut session = self.session.lock();
        if session.config_depth == 0 {
            session.unbracketed_changes += 1;
        }
        session.inputs.retain(|i| i != input);
    }

    fn inputs(&self) -> Vec<DeviceInput> {
        self.session.lock().inputs.clone()
    }

    fn add_movie_output(&mut self) -> Result<(), String> {
        let mut session = self.session.lock();
        if session.has_movie_output {
            return Err("movie output already installed".to_string());
        }
        session.has_movie_output = true;
        Ok(())
    }

    async fn start_running(&mut self) -> bool {
        tokio::task::yield_now().await;
        let mut session = self.session.lock();
        session.running = !session.fail_start;
        session.running
    }

    fn stop_running(&mut self) {
        self.session.lock().running = false;
    }

    fn is_running(&self) -> bool {
        self.session.lock().running
    }

    fn start_recording(&mut self, path: &Path, notifier: FinishNotifier) -> Result<(), String> {
        let mut session = self.session.lock();
        if !session.has_movie_output {
            return Err("no movie output installed".to_string());
        }
        if session.recording_path.is_some() {
            return Err("already recording".to_string());
        }
        session.recording_path = Some(path.to_path_buf());
        session.notifier = Some(notifier);
        session.recordings_started += 1;
        Ok(())
    }

    fn stop_recording(&mut self) {
        let mut session = self.session.lock();
        let (Some(path), Some(notifier)) = (session.recording_path.take(), session.notifier.take()) else {
            return;
        };
        session.recordings_stopped += 1;

        let error = match session.recording_error.take() {
            Some(error) => Some(error),
            None => std::fs::write(&path, b"simulated movie data")
                .err()
                .map(|e| e.to_string()),
        };
        let _ = notifier.send(RecordingFinished { file: path, error });
    }
}

/// Permission gateway with fixed answers
pub struct SimulatedPermissions {
    camera: bool,
    microphone: bool,
    camera_requests: AtomicUsize,
    microphone_requests: AtomicUsize,
}

impl SimulatedPermissions {
    pub fn new(camera: bool, microphone: bool) -> Self {
        Self {
            camera,
            microphone,
            camera_requests: AtomicUsize::new(0),
            microphone_requests: AtomicUsize::new(0),
        }
    }

    pub fn granted() -> Self {
        Self::new(true, true)
    }

    pub fn camera_requests(&self) -> usize {
        self.camera_requests.load(Ordering::SeqCst)
    }

    pub fn microphone_requests(&self) -> usize {
        self.microphone_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGateway for SimulatedPermissions {
    async fn request_camera_access(&self) -> bool {
        self.camera_requests.fetch_add(1, Ordering::SeqCst);
        self.camera
    }

    async fn request_microphone_access(&self) -> bool {
        self.microphone_requests.fetch_add(1, Ordering::SeqCst);
        self.microphone
    }
}

/// Preview surface that remembers its binding and size
#[derive(Default)]
pub struct SimulatedPreview {
    attached: Mutex<Option<SessionId>>,
    bounds: Mutex<Option<Bounds>>,
}

impl SimulatedPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached_to(&self) -> Option<SessionId> {
        *self.attached.lock()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        *self.bounds.lock()
    }
}

impl PreviewSurface for SimulatedPreview {
    fn attach(&self, session: SessionId) {
        *self.attached.lock() = Some(session);
    }

    fn detach(&self) {
        *self.attached.lock() = None;
    }

    fn resize(&self, bounds: Bounds) {
        *self.bounds.lock() = Some(bounds);
    }
}
