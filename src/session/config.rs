use crate::session::hint::DEFAULT_SUGGESTIONS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "capture-2026-08-25-onboarding")
    pub session_id: String,

    /// Maximum capture length; auto-stop fires when it elapses
    /// Default: 10 seconds
    pub capture_duration: Duration,

    /// Idle time before a recording suggestion is surfaced
    /// Default: 5 seconds
    pub hint_delay: Duration,

    /// Suggestion pool the hint is drawn from
    pub suggestions: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("capture-{}", uuid::Uuid::new_v4()),
            capture_duration: Duration::from_secs(10), // Voice sample length
            hint_delay: Duration::from_secs(5),
            suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = SessionConfig::default();
        assert_eq!(config.capture_duration, Duration::from_secs(10));
        assert_eq!(config.hint_delay, Duration::from_secs(5));
        assert_eq!(config.suggestions.len(), 5);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionConfig::default();
        let b = SessionConfig::default();
        assert_ne!(a.session_id, b.session_id);
    }
}
