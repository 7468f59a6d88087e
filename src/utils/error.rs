//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recorder::CaptureError;
use crate::storage::StorageError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Coordinator unavailable")]
    CoordinatorGone,
}

/// Error response for the presentation layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Blocking errors stay on screen; others clear on the next action
    pub persistent: bool,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        let (code, persistent) = match &error {
            AppError::Io(_) => ("IO_ERROR", false),
            AppError::Serialization(_) => ("SERIALIZATION_ERROR", false),
            AppError::Capture(CaptureError::PermissionDenied(_)) => ("PERMISSION_DENIED", true),
            AppError::Capture(CaptureError::DeviceUnavailable(_)) => ("DEVICE_UNAVAILABLE", true),
            AppError::Capture(CaptureError::SessionStartFailed) => ("SESSION_START_FAILED", true),
            AppError::Capture(CaptureError::StorageFailed(_)) | AppError::Storage(_) => {
                ("STORAGE_FAILED", false)
            }
            AppError::Capture(_) => ("CAPTURE_ERROR", false),
            AppError::Config(_) => ("CONFIG_ERROR", true),
            AppError::CoordinatorGone => ("COORDINATOR_GONE", true),
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
            persistent,
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
