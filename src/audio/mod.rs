pub mod artifact;
pub mod backend;
pub mod cpal_backend;

pub use artifact::{encode_wav, CaptureArtifact, CaptureSummary, WAV_MIME_TYPE};
pub use backend::{AudioChunk, MicStream, MicrophoneBackend, MicrophoneConfig};
pub use cpal_backend::CpalBackend;
