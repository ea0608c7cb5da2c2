//! Recording session management
//!
//! This module provides the recording session state machine and its
//! async runner:
//! - `RecordingSession`: pure transition logic (commands, events, actions)
//! - `SessionRunner` / `SessionHandle`: tokio task driving the machine,
//!   its timers, and the microphone backend
//! - `SessionSnapshot` over a watch channel for presentation
//! - Hint scheduling with a pluggable suggestion picker

mod config;
mod event;
mod hint;
mod machine;
mod runner;
mod state;
mod timer;

pub use config::SessionConfig;
pub use event::{SessionAction, SessionEvent};
pub use hint::{SuggestionPicker, UniformPicker, DEFAULT_SUGGESTIONS};
pub use machine::RecordingSession;
pub use runner::{SessionHandle, SessionRunner};
pub use state::{SessionSnapshot, SessionStatus};
