use crate::audio::CaptureArtifact;
use crate::error::CaptureError;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the user to start; the hint timer may be armed
    Idle,
    /// Microphone access requested, outcome pending
    AwaitingPermission,
    /// Stream attached, chunks buffering, auto-stop timer armed
    Recording,
    /// Buffer drained, finalize outcome pending; commands are refused
    Stopping,
    /// A playable artifact is held; terminal until reset
    Captured,
    /// A classified error is held; start retries, reset returns to Idle
    Failed,
}

impl SessionStatus {
    /// Waiting for user action with no capture in flight
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionStatus::Idle)
    }

    /// A capture attempt is in flight, from request to finalize outcome
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionStatus::AwaitingPermission | SessionStatus::Recording | SessionStatus::Stopping
        )
    }

    /// Capture finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Captured | SessionStatus::Failed)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::AwaitingPermission => "awaiting_permission",
            SessionStatus::Recording => "recording",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Captured => "captured",
            SessionStatus::Failed => "failed",
        };
        write!(f, "{}", label)
    }
}

/// Observable session state, published on every transition
///
/// Exactly one of `artifact` / `error` is set in the terminal statuses;
/// both are `None` everywhere else.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Current lifecycle status
    pub status: SessionStatus,
    /// Suggestion surfaced after idling, cleared on start/reset
    pub hint: Option<String>,
    /// Classified failure (set only in Failed)
    pub error: Option<CaptureError>,
    /// Captured audio (set only in Captured)
    pub artifact: Option<CaptureArtifact>,
}

impl SessionSnapshot {
    /// Snapshot of a fresh idle session
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            hint: None,
            error: None,
            artifact: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(SessionStatus::Idle.is_idle());
        assert!(SessionStatus::AwaitingPermission.is_active());
        assert!(SessionStatus::Recording.is_active());
        assert!(SessionStatus::Stopping.is_active());
        assert!(SessionStatus::Captured.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Recording.is_terminal());
        assert!(!SessionStatus::Stopping.is_terminal());
        assert!(!SessionStatus::Captured.is_active());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&SessionStatus::AwaitingPermission).unwrap();
        assert_eq!(json, "\"awaiting_permission\"");
    }
}
