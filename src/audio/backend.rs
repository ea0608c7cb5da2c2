use crate::audio::CaptureArtifact;
use crate::error::CaptureError;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 after downmix)
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioChunk {
    /// Duration covered by this chunk in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// A granted microphone stream
///
/// Dropping the receiver does not stop capture; call
/// [`MicrophoneBackend::release`] for that.
#[derive(Debug)]
pub struct MicStream {
    /// Device label for logging
    pub device: String,
    /// Chunk delivery channel; closes when the device stops producing
    pub chunks: mpsc::Receiver<AudioChunk>,
}

/// Configuration for microphone capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    /// Sample rate to request from the device (it may pick another)
    pub preferred_sample_rate: u32,
    /// Channel count delivered to the session (1 = mono)
    pub channels: u16,
    /// Chunk size in milliseconds (affects delivery latency)
    pub chunk_ms: u64,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            preferred_sample_rate: 16000, // Speech-band capture
            channels: 1,                  // Mono
            chunk_ms: 100,                // 100ms chunks
        }
    }
}

/// Microphone capability trait
///
/// The session never touches a device directly; it requests access,
/// consumes chunks, releases, and asks for the buffered chunks to be
/// finalized into a playable artifact. Implementations:
/// - `CpalBackend`: real capture via cpal on a dedicated thread
/// - test doubles: scripted grant/deny and canned chunk feeds
#[async_trait::async_trait]
pub trait MicrophoneBackend: Send + Sync {
    /// Request microphone access and start capturing
    ///
    /// Resolves to a chunk stream on grant, or a classified
    /// [`CaptureError`] on denial / missing device / setup failure.
    async fn request_access(&mut self) -> Result<MicStream, CaptureError>;

    /// Stop capturing and release the device
    async fn release(&mut self) -> Result<(), CaptureError>;

    /// Encode buffered chunks into a playable artifact
    fn finalize(&self, chunks: &[AudioChunk]) -> Result<CaptureArtifact, CaptureError>;

    /// Check if the device is currently held
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
