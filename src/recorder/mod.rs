//! Capture recording system
//!
//! This module implements the dual-camera capture workflow:
//! - CaptureSessionCoordinator, the state machine owning the capture session
//! - RecordingTimer driving the bounded recording clock
//! - CoordinatorHandle serializing operations onto one background task

pub mod coordinator;
pub mod error;
pub mod handle;
pub mod state;
pub mod timer;

pub use coordinator::{CaptureSessionCoordinator, PreviewBounds, PreviewPair};
pub use error::{CaptureError, CaptureResult};
pub use handle::CoordinatorHandle;
pub use state::{
    format_elapsed, CoordinatorEvent, CoordinatorState, FailureReason, PreviewLayout,
    RecordingSession, StatusMessage, StatusSeverity,
};
pub use timer::RecordingTimer;
