pub mod audio;
pub mod config;
pub mod error;
pub mod flow;
pub mod session;

pub use audio::{
    encode_wav, AudioChunk, CaptureArtifact, CaptureSummary, CpalBackend, MicStream,
    MicrophoneBackend, MicrophoneConfig, WAV_MIME_TYPE,
};
pub use config::Config;
pub use error::{CaptureError, SessionError};
pub use flow::{CaptureFlow, Navigator};
pub use session::{
    RecordingSession, SessionConfig, SessionHandle, SessionRunner, SessionSnapshot, SessionStatus,
    SuggestionPicker, UniformPicker,
};
