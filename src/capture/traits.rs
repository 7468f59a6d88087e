//! Capture trait definitions
//!
//! Platform-agnostic contracts between the capture coordinator and the
//! platform media framework.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Physical camera position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
}

impl CameraPosition {
    /// The camera on the opposite side of the device
    pub fn other(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        }
    }

    /// Lowercase label used in file names and logs
    pub fn label(self) -> &'static str {
        match self {
            CameraPosition::Front => "front",
            CameraPosition::Back => "back",
        }
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of capture device a session input is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    FrontCamera,
    BackCamera,
    Microphone,
}

impl DeviceKind {
    pub fn camera(position: CameraPosition) -> Self {
        match position {
            CameraPosition::Front => DeviceKind::FrontCamera,
            CameraPosition::Back => DeviceKind::BackCamera,
        }
    }

    pub fn is_video(self) -> bool {
        !matches!(self, DeviceKind::Microphone)
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::FrontCamera => f.write_str("front camera"),
            DeviceKind::BackCamera => f.write_str("back camera"),
            DeviceKind::Microphone => f.write_str("microphone"),
        }
    }
}

/// Handle to one acquired capture device
///
/// Immutable once acquired. Installing it on a session does not consume it,
/// so an uninstalled camera can be kept ready for a later swap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInput {
    /// Platform device identifier
    pub device_id: String,

    /// What the device captures
    pub kind: DeviceKind,
}

impl DeviceInput {
    pub fn new(device_id: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            device_id: device_id.into(),
            kind,
        }
    }
}

/// Identity of a live capture session, used to bind preview surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Preview rectangle in presentation coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// Completion report for one file recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFinished {
    /// File the platform wrote (possibly partial on error)
    pub file: PathBuf,

    /// Platform error, if the recording did not complete cleanly
    pub error: Option<String>,
}

/// Channel the platform uses to report that a recording has finished
pub type FinishNotifier = mpsc::UnboundedSender<RecordingFinished>;

/// Hardware capture session
///
/// Input changes are only legal between `begin_configuration` and
/// `commit_configuration`. Implementations may block inside the
/// synchronous methods, so callers keep them off interactive threads.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Identity of this session
    fn session_id(&self) -> SessionId;

    /// Acquire an input for the given device. Fails if the device is absent
    /// or the input cannot be constructed.
    fn acquire_input(&self, kind: DeviceKind) -> Result<DeviceInput, String>;

    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    /// Whether the session would accept this input right now
    fn can_add_input(&self, input: &DeviceInput) -> bool;

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), String>;

    fn remove_input(&mut self, input: &DeviceInput);

    /// Inputs currently installed
    fn inputs(&self) -> Vec<DeviceInput>;

    /// Install the movie-file output
    fn add_movie_output(&mut self) -> Result<(), String>;

    /// Start the pipeline. Resolves once the platform reports whether it is
    /// actually running.
    async fn start_running(&mut self) -> bool;

    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    /// Begin writing a movie file. Completion (or an abort) is always
    /// reported exactly once through `notifier`.
    fn start_recording(&mut self, path: &Path, notifier: FinishNotifier) -> Result<(), String>;

    /// Ask the platform to stop the active recording
    fn stop_recording(&mut self);
}

/// Platform permission prompts
#[async_trait]
pub trait PermissionGateway: Send + Sync {
    async fn request_camera_access(&self) -> bool;

    async fn request_microphone_access(&self) -> bool;
}

/// Rendering sink for live video, owned by the presentation layer
pub trait PreviewSurface: Send + Sync {
    /// Bind the surface to a running session
    fn attach(&self, session: SessionId);

    /// Drop the binding to the session
    fn detach(&self);

    fn resize(&self, bounds: Bounds);
}
