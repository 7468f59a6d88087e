//! Capture error taxonomy

use super::state::{CoordinatorState, FailureReason};
use crate::capture::{CameraPosition, DeviceKind, PermissionKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0} access denied")]
    PermissionDenied(PermissionKind),

    #[error("{0} unavailable")]
    DeviceUnavailable(DeviceKind),

    #[error("Capture session failed to start")]
    SessionStartFailed,

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("Saving recording failed: {0}")]
    StorageFailed(String),

    #[error("Could not switch to the {0} camera")]
    CameraSwitchFailed(CameraPosition),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: CoordinatorState,
    },

    #[error("Capture session is not running")]
    SessionNotRunning,

    #[error("A recording is still being finalized")]
    RecordingInProgress,

    #[error("No recording in flight for {}", .0.display())]
    UnexpectedFinish(PathBuf),
}

impl CaptureError {
    /// Whether the coordinator can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CaptureError::PermissionDenied(_)
                | CaptureError::DeviceUnavailable(_)
                | CaptureError::SessionStartFailed
        )
    }
}

impl From<FailureReason> for CaptureError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::PermissionDenied(kind) => CaptureError::PermissionDenied(kind),
            FailureReason::DeviceUnavailable(kind) => CaptureError::DeviceUnavailable(kind),
            FailureReason::SessionStartFailed => CaptureError::SessionStartFailed,
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
