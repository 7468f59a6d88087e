//! Camera and microphone permission tracking
//!
//! Permission answers only ever move forward: once a kind is granted or
//! denied it stays that way for the lifetime of the coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission the capture pipeline needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    Camera,
    Microphone,
}

impl PermissionKind {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "Camera",
            PermissionKind::Microphone => "Microphone",
        }
    }

    /// Where the user can grant the permission by hand
    pub fn settings_path(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "Settings > Privacy & Security > Camera",
            PermissionKind::Microphone => "Settings > Privacy & Security > Microphone",
        }
    }

    /// Deep link into the app's settings page
    pub fn settings_url(&self) -> &'static str {
        "app-settings:"
    }

    /// Remediation text shown alongside a denial
    pub fn remediation(&self) -> String {
        format!(
            "Please allow {} access in {} to use video recording.",
            self.name().to_lowercase(),
            self.settings_path()
        )
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answer for a single permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, PermissionStatus::Unknown)
    }
}

/// Camera and microphone answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionState {
    pub camera: PermissionStatus,
    pub microphone: PermissionStatus,
}

impl PermissionState {
    pub fn get(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::Camera => self.camera,
            PermissionKind::Microphone => self.microphone,
        }
    }

    /// Record an answer. Returns false (and changes nothing) if the kind was
    /// already resolved.
    pub fn resolve(&mut self, kind: PermissionKind, granted: bool) -> bool {
        let slot = match kind {
            PermissionKind::Camera => &mut self.camera,
            PermissionKind::Microphone => &mut self.microphone,
        };
        if slot.is_resolved() {
            tracing::debug!("Ignoring repeated {} permission answer", kind);
            return false;
        }
        *slot = if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };
        true
    }

    pub fn all_granted(&self) -> bool {
        self.camera == PermissionStatus::Granted && self.microphone == PermissionStatus::Granted
    }

    /// First denied permission, camera before microphone
    pub fn first_denied(&self) -> Option<PermissionKind> {
        if self.camera == PermissionStatus::Denied {
            Some(PermissionKind::Camera)
        } else if self.microphone == PermissionStatus::Denied {
            Some(PermissionKind::Microphone)
        } else {
            None
        }
    }
}
