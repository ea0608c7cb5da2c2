use crate::audio::{AudioChunk, CaptureArtifact, MicStream};
use crate::error::CaptureError;

/// Everything that can happen to a session besides a direct command
///
/// The machine consumes exactly one event at a time; there are no other
/// transition triggers. Events arriving after the state they belong to
/// has passed (a canceled timer racing its abort, a late chunk) are
/// dropped by the machine's status guards.
#[derive(Debug)]
pub enum SessionEvent {
    /// Microphone granted; the stream starts delivering chunks
    PermissionGranted(MicStream),
    /// Microphone refused or unavailable, classified
    PermissionDenied(CaptureError),
    /// One chunk of captured audio arrived
    ChunkAvailable(AudioChunk),
    /// Buffered chunks were encoded into a playable artifact
    CaptureFinalized(CaptureArtifact),
    /// Encoding failed after the device was released
    CaptureFailed(CaptureError),
    /// The capture window elapsed
    AutoStopElapsed,
    /// The idle hint delay elapsed
    HintElapsed,
}

impl SessionEvent {
    /// Short name for transition logs
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::PermissionGranted(_) => "permission_granted",
            SessionEvent::PermissionDenied(_) => "permission_denied",
            SessionEvent::ChunkAvailable(_) => "chunk_available",
            SessionEvent::CaptureFinalized(_) => "capture_finalized",
            SessionEvent::CaptureFailed(_) => "capture_failed",
            SessionEvent::AutoStopElapsed => "auto_stop_elapsed",
            SessionEvent::HintElapsed => "hint_elapsed",
        }
    }
}

/// Side effects the machine asks the runner to perform
///
/// The machine itself never touches timers, channels, or the
/// microphone; it returns actions and the runner executes them in
/// order.
#[derive(Debug)]
pub enum SessionAction {
    /// Ask the backend for microphone access (outcome returns as an event)
    RequestMicrophone,
    /// Start consuming chunks from a granted stream
    AttachStream(MicStream),
    /// Arm the capture-window timer
    ArmAutoStop,
    /// Abort the capture-window timer
    CancelAutoStop,
    /// Arm the idle hint timer
    ArmHintTimer,
    /// Abort the idle hint timer
    CancelHintTimer,
    /// Release the device and encode the drained chunks
    FinalizeCapture { chunks: Vec<AudioChunk> },
    /// Release the device without finalizing
    ReleaseMicrophone,
}
