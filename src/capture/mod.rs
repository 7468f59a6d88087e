//! Capture platform contracts
//!
//! This module defines what the coordinator needs from the platform media
//! framework (session, permissions, preview surfaces) plus an in-memory
//! implementation of those contracts.

pub mod permissions;
pub mod simulated;
pub mod traits;

// Re-export traits
pub use traits::{
    Bounds, CameraPosition, CaptureBackend, DeviceInput, DeviceKind, FinishNotifier,
    PermissionGateway, PreviewSurface, RecordingFinished, SessionId,
};

pub use permissions::{PermissionKind, PermissionState, PermissionStatus};
