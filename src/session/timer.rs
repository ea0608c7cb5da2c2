use crate::session::event::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One-shot timer owned by the session runner
///
/// Arming spawns a sleep task that sends `event` when the delay
/// elapses. The slot owns the task handle: re-arming, canceling, or
/// dropping the slot aborts it, so a dead timer cannot fire later.
/// An event already queued at abort time is dropped by the machine's
/// status guards instead.
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Arm the timer, replacing any previously armed task
    pub fn arm(&mut self, delay: Duration, events: mpsc::Sender<SessionEvent>, event: SessionEvent) {
        self.cancel();
        debug!("Arming {} timer: {:?}", self.name, delay);

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event).await;
        }));
    }

    /// Abort the armed task, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Canceled {} timer", self.name);
        }
    }

    /// True while an armed task has not fired or been canceled
    pub fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
