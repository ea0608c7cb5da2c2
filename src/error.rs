use crate::session::SessionStatus;

/// Classified microphone/capture failure shown to the user
///
/// Every variant carries a fixed, user-facing message. Classification
/// happens at the backend boundary; the session only stores and displays
/// the result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The user (or OS) refused microphone access
    #[error("Microphone access was denied. Please grant permission to use your microphone.")]
    PermissionDenied,

    /// No usable input device exists
    #[error("No microphone found. Please ensure a microphone is connected to your device.")]
    DeviceNotFound,

    /// Anything else (device busy, stream setup failure, encoder failure)
    #[error("An error occurred while accessing the microphone. Please try again.")]
    Unknown(String),
}

impl CaptureError {
    /// True when retrying without user action is pointless
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, CaptureError::PermissionDenied)
    }

    /// Internal detail for logs (the Display message stays user-facing)
    pub fn detail(&self) -> &str {
        match self {
            CaptureError::PermissionDenied => "permission denied",
            CaptureError::DeviceNotFound => "no input device",
            CaptureError::Unknown(detail) => detail,
        }
    }
}

/// Command-level failure reported back to the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The command is not legal in the session's current status
    #[error("cannot {command} while session is {status:?}")]
    InvalidState {
        /// Command that was refused
        command: &'static str,
        /// Status the session was in at the time
        status: SessionStatus,
    },

    /// The session task has shut down; no further commands are possible
    #[error("session is closed")]
    Closed,
}

impl SessionError {
    pub(crate) fn invalid(command: &'static str, status: SessionStatus) -> Self {
        SessionError::InvalidState { command, status }
    }
}
