use crate::error::SessionError;
use crate::session::{SessionHandle, SessionStatus};
use tracing::{debug, info};
use uuid::Uuid;

/// Navigation collaborator
///
/// The capture flow does not own screens; it only signals that the
/// user should move on to the matching step.
pub trait Navigator: Send + Sync {
    /// Move the user to the matching step
    fn open_matching(&self);
}

/// Hands a confirmed capture off to the matching step
///
/// Upload and analysis of the sample are out of scope; confirmation
/// only navigates. One navigation per captured artifact: confirming
/// the same artifact twice is accepted without navigating again, and a
/// fresh artifact after a reset navigates anew.
pub struct CaptureFlow {
    session: SessionHandle,
    navigator: Box<dyn Navigator>,
    /// Artifact already handed off, if any
    confirmed: Option<Uuid>,
}

impl CaptureFlow {
    pub fn new(session: SessionHandle, navigator: Box<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            confirmed: None,
        }
    }

    /// Accept the captured sample and move on
    ///
    /// Legal only while the session is Captured.
    pub fn confirm(&mut self) -> Result<(), SessionError> {
        let snapshot = self.session.snapshot();
        if snapshot.status != SessionStatus::Captured {
            return Err(SessionError::invalid("confirm", snapshot.status));
        }
        let Some(artifact) = snapshot.artifact else {
            return Err(SessionError::invalid("confirm", snapshot.status));
        };

        if self.confirmed == Some(artifact.id) {
            debug!("Capture {} already confirmed", artifact.id);
            return Ok(());
        }

        info!(
            "Confirming capture {} ({:.1}s), navigating to matching",
            artifact.id, artifact.duration_secs
        );
        self.confirmed = Some(artifact.id);
        self.navigator.open_matching();
        Ok(())
    }
}
