//! Coordinator state management
//!
//! Defines the capture state machine, the per-recording session record and
//! the events published to the presentation layer.

use crate::capture::{CameraPosition, DeviceKind, PermissionKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why the coordinator stopped for good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    PermissionDenied(PermissionKind),
    DeviceUnavailable(DeviceKind),
    SessionStartFailed,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::PermissionDenied(kind) => write!(f, "{} access denied", kind),
            FailureReason::DeviceUnavailable(kind) => write!(f, "{} unavailable", kind),
            FailureReason::SessionStartFailed => f.write_str("session failed to start"),
        }
    }
}

/// Current state of the capture coordinator
///
/// `Failed` is absorbing: nothing leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordinatorState {
    /// Nothing acquired
    #[default]
    Idle,
    /// Waiting on permission prompts
    PermissionsPending,
    /// Building the capture pipeline
    SessionConfiguring,
    /// Pipeline confirmed running, ready to record
    SessionRunning,
    /// Writing a movie file
    Recording,
    Failed(FailureReason),
}

impl CoordinatorState {
    pub fn is_failed(&self) -> bool {
        matches!(self, CoordinatorState::Failed(_))
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorState::Idle => f.write_str("idle"),
            CoordinatorState::PermissionsPending => f.write_str("waiting for permissions"),
            CoordinatorState::SessionConfiguring => f.write_str("configuring the session"),
            CoordinatorState::SessionRunning => f.write_str("session running"),
            CoordinatorState::Recording => f.write_str("recording"),
            CoordinatorState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Which camera feeds the large preview and which the overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLayout {
    pub main: CameraPosition,
    pub pip: CameraPosition,
}

impl PreviewLayout {
    pub fn for_active(active: CameraPosition) -> Self {
        Self {
            main: active,
            pip: active.other(),
        }
    }
}

/// One movie file being written
///
/// Lives from "start recording" until the platform reports the file
/// finished and the storage hand-off has completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    /// Destination the platform writes to
    pub output_file: PathBuf,

    /// Wall-clock start
    pub started_at: DateTime<Utc>,

    /// Camera that was active when recording began
    pub camera: CameraPosition,

    /// Whole seconds elapsed, advanced by the recording timer
    pub elapsed_secs: u32,

    /// Stop has been requested; waiting for the finish report
    pub stop_requested: bool,
}

impl RecordingSession {
    pub fn new(output_file: PathBuf, camera: CameraPosition) -> Self {
        Self {
            output_file,
            started_at: Utc::now(),
            camera,
            elapsed_secs: 0,
            stop_requested: false,
        }
    }
}

/// How long a status should stay on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    Info,
    Success,
    /// Recoverable failure, cleared by the next action
    Transient,
    /// Blocking failure, stays until the screen is left
    Persistent,
}

/// User-visible status line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub severity: StatusSeverity,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: StatusSeverity::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: StatusSeverity::Success,
        }
    }

    pub fn transient(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: StatusSeverity::Transient,
        }
    }

    pub fn persistent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: StatusSeverity::Persistent,
        }
    }
}

/// Events published by the coordinator
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CoordinatorEvent {
    StateChanged { state: CoordinatorState },
    Status { status: StatusMessage },
    /// Main and PiP roles swapped
    CameraSwitched { layout: PreviewLayout },
    /// Whether the camera-switch control should be enabled
    SwitchEnabled { enabled: bool },
    RecordingStarted { path: PathBuf, camera: CameraPosition },
    /// Timer tick while recording
    Progress { elapsed_secs: u32, remaining_secs: u32 },
    RecordingStopped { elapsed_secs: u32 },
    RecordingSaved { path: PathBuf },
    RecordingFailed { reason: String },
}

/// Format elapsed seconds as `mm:ss`
pub fn format_elapsed(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
