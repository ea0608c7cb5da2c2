use crate::audio::{AudioChunk, CaptureArtifact, MicStream};
use crate::error::{CaptureError, SessionError};
use crate::session::config::SessionConfig;
use crate::session::event::{SessionAction, SessionEvent};
use crate::session::hint::SuggestionPicker;
use crate::session::state::{SessionSnapshot, SessionStatus};
use tracing::{debug, info, warn};

/// The recording session state machine
///
/// Pure transition logic: commands and events mutate status and return
/// the side effects ([`SessionAction`]s) for the runner to execute.
/// Nothing here touches timers, channels, or devices, which keeps
/// every edge testable without a runtime.
///
/// Lifecycle: Idle -> AwaitingPermission -> Recording -> Stopping ->
/// Captured, with Failed reachable from AwaitingPermission (denied or
/// missing device) and from Stopping (finalization errors). `start`
/// retries from Failed; `reset` returns either terminal status to Idle.
pub struct RecordingSession {
    config: SessionConfig,
    status: SessionStatus,
    /// Interim capture buffer, non-empty only while Recording
    chunks: Vec<AudioChunk>,
    artifact: Option<CaptureArtifact>,
    error: Option<CaptureError>,
    hint: Option<String>,
    /// Set once the hint chance for the current idle period is gone,
    /// either shown or overtaken by a start
    hint_spent: bool,
    picker: Box<dyn SuggestionPicker>,
}

impl RecordingSession {
    pub fn new(config: SessionConfig, picker: Box<dyn SuggestionPicker>) -> Self {
        Self {
            config,
            status: SessionStatus::Idle,
            chunks: Vec::new(),
            artifact: None,
            error: None,
            hint: None,
            hint_spent: false,
            picker,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Begin a capture attempt
    ///
    /// Legal in Idle (first attempt) and Failed (retry). Clears any
    /// hint and stored error, then asks the runner to request the
    /// microphone; the outcome comes back as a permission event.
    pub fn start(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.status {
            SessionStatus::Idle | SessionStatus::Failed => {
                self.hint = None;
                self.hint_spent = true;
                self.error = None;
                self.transition(SessionStatus::AwaitingPermission);
                Ok(vec![
                    SessionAction::CancelHintTimer,
                    SessionAction::RequestMicrophone,
                ])
            }
            status => Err(SessionError::invalid("start", status)),
        }
    }

    /// Stop the capture before the window elapses
    ///
    /// Legal only while Recording. Drains the chunk buffer and holds
    /// the session in Stopping until the runner feeds back the
    /// finalize outcome, so a second stop (or a racing window fire)
    /// cannot drain again.
    pub fn stop(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.status {
            SessionStatus::Recording => {
                info!(
                    "Session {}: stopping capture ({} chunks buffered)",
                    self.config.session_id,
                    self.chunks.len()
                );
                let chunks = std::mem::take(&mut self.chunks);
                self.transition(SessionStatus::Stopping);
                Ok(vec![
                    SessionAction::CancelAutoStop,
                    SessionAction::ReleaseMicrophone,
                    SessionAction::FinalizeCapture { chunks },
                ])
            }
            status => Err(SessionError::invalid("stop", status)),
        }
    }

    /// Discard the capture outcome and return to Idle
    ///
    /// Legal in Captured (re-record) and Failed (clear the error).
    /// Re-arms the hint timer for the fresh idle period.
    pub fn reset(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        match self.status {
            SessionStatus::Captured | SessionStatus::Failed => {
                self.artifact = None;
                self.error = None;
                self.hint = None;
                self.hint_spent = false;
                self.chunks.clear();
                self.transition(SessionStatus::Idle);
                Ok(vec![SessionAction::ArmHintTimer])
            }
            status => Err(SessionError::invalid("reset", status)),
        }
    }

    /// Feed one event through the transition table
    ///
    /// Events that no longer match the current status (a timer racing
    /// its cancelation, a chunk after release) are dropped here.
    pub fn apply(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::PermissionGranted(stream) => self.on_permission_granted(stream),
            SessionEvent::PermissionDenied(error) => self.on_permission_denied(error),
            SessionEvent::ChunkAvailable(chunk) => self.on_chunk(chunk),
            SessionEvent::CaptureFinalized(artifact) => self.on_finalized(artifact),
            SessionEvent::CaptureFailed(error) => self.on_capture_failed(error),
            SessionEvent::AutoStopElapsed => self.on_auto_stop(),
            SessionEvent::HintElapsed => self.on_hint_elapsed(),
        }
    }

    /// Project the observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            hint: self.hint.clone(),
            error: self.error.clone(),
            artifact: self.artifact.clone(),
        }
    }

    fn on_permission_granted(&mut self, stream: MicStream) -> Vec<SessionAction> {
        if self.status != SessionStatus::AwaitingPermission {
            debug!(
                "Session {}: dropping stale permission grant in {}",
                self.config.session_id, self.status
            );
            // The stream is dead weight; make sure the device is freed
            return vec![SessionAction::ReleaseMicrophone];
        }

        info!(
            "Session {}: microphone granted ({})",
            self.config.session_id, stream.device
        );
        self.chunks.clear();
        self.transition(SessionStatus::Recording);
        vec![
            SessionAction::AttachStream(stream),
            SessionAction::ArmAutoStop,
        ]
    }

    fn on_permission_denied(&mut self, error: CaptureError) -> Vec<SessionAction> {
        if self.status != SessionStatus::AwaitingPermission {
            debug!(
                "Session {}: dropping stale permission denial in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }

        warn!(
            "Session {}: microphone request failed: {}",
            self.config.session_id,
            error.detail()
        );
        self.error = Some(error);
        self.transition(SessionStatus::Failed);
        Vec::new()
    }

    fn on_chunk(&mut self, chunk: AudioChunk) -> Vec<SessionAction> {
        if self.status != SessionStatus::Recording {
            debug!(
                "Session {}: dropping chunk in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }

        self.chunks.push(chunk);
        Vec::new()
    }

    fn on_auto_stop(&mut self) -> Vec<SessionAction> {
        if self.status != SessionStatus::Recording {
            debug!(
                "Session {}: ignoring auto-stop in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }

        info!(
            "Session {}: capture window elapsed ({} chunks buffered)",
            self.config.session_id,
            self.chunks.len()
        );
        let chunks = std::mem::take(&mut self.chunks);
        self.transition(SessionStatus::Stopping);
        vec![
            SessionAction::CancelAutoStop,
            SessionAction::ReleaseMicrophone,
            SessionAction::FinalizeCapture { chunks },
        ]
    }

    fn on_finalized(&mut self, artifact: CaptureArtifact) -> Vec<SessionAction> {
        if self.status != SessionStatus::Stopping {
            debug!(
                "Session {}: ignoring finalized capture in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }

        info!(
            "Session {}: captured {:.1}s of audio ({} bytes)",
            self.config.session_id,
            artifact.duration_secs,
            artifact.bytes.len()
        );
        self.artifact = Some(artifact);
        self.transition(SessionStatus::Captured);
        Vec::new()
    }

    fn on_capture_failed(&mut self, error: CaptureError) -> Vec<SessionAction> {
        if self.status != SessionStatus::Stopping {
            debug!(
                "Session {}: ignoring capture failure in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }

        warn!(
            "Session {}: finalization failed: {}",
            self.config.session_id,
            error.detail()
        );
        self.error = Some(error);
        self.transition(SessionStatus::Failed);
        Vec::new()
    }

    fn on_hint_elapsed(&mut self) -> Vec<SessionAction> {
        if !self.status.is_idle() || self.hint.is_some() || self.hint_spent {
            debug!(
                "Session {}: ignoring hint timer in {}",
                self.config.session_id, self.status
            );
            return Vec::new();
        }
        if self.config.suggestions.is_empty() {
            return Vec::new();
        }

        let idx = self.picker.pick_index(self.config.suggestions.len());
        let suggestion = self.config.suggestions[idx % self.config.suggestions.len()].clone();
        info!(
            "Session {}: surfacing suggestion: {}",
            self.config.session_id, suggestion
        );
        self.hint = Some(suggestion);
        self.hint_spent = true;
        Vec::new()
    }

    fn transition(&mut self, to: SessionStatus) {
        info!(
            "Session {}: {} -> {}",
            self.config.session_id, self.status, to
        );
        self.status = to;
    }
}
