use crate::audio::MicrophoneConfig;
use crate::session::{SessionConfig, DEFAULT_SUGGESTIONS};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Application configuration
///
/// Every section has defaults, so a missing config file still yields a
/// working setup (10s capture, 5s hint, stock suggestions).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: MicrophoneConfig,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "voicematch-capture".to_string(),
        }
    }
}

/// Session timings and suggestion pool
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Capture window in seconds before auto-stop
    pub capture_secs: u64,
    /// Idle seconds before a suggestion is surfaced
    pub hint_delay_secs: u64,
    /// Suggestion pool (falls back to the stock prompts)
    pub suggestions: Vec<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            capture_secs: 10,
            hint_delay_secs: 5,
            suggestions: DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Session configuration with a fresh session id
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            capture_duration: Duration::from_secs(self.session.capture_secs),
            hint_delay: Duration::from_secs(self.session.hint_delay_secs),
            suggestions: self.session.suggestions.clone(),
            ..SessionConfig::default()
        }
    }

    pub fn microphone_config(&self) -> MicrophoneConfig {
        self.capture.clone()
    }
}
