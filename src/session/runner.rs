use crate::audio::{AudioChunk, MicrophoneBackend};
use crate::error::SessionError;
use crate::session::config::SessionConfig;
use crate::session::event::{SessionAction, SessionEvent};
use crate::session::hint::SuggestionPicker;
use crate::session::machine::RecordingSession;
use crate::session::state::SessionSnapshot;
use crate::session::timer::TimerSlot;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, info, warn};

/// Commands accepted by the runner task
enum SessionCommand {
    Start {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Reset {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Shutdown,
}

/// One input consumed per loop iteration
enum Input {
    Command(SessionCommand),
    Event(SessionEvent),
    StreamClosed,
    HandlesDropped,
}

/// Clonable interface to a running session
///
/// Commands resolve once the runner has processed them; state comes
/// back through the watch channel, which updates exactly once per
/// observable transition.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    updates: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Begin a capture attempt (legal in Idle and Failed)
    pub async fn start(&self) -> Result<(), SessionError> {
        self.command(|reply| SessionCommand::Start { reply }).await
    }

    /// Stop the capture early (legal while Recording); resolves once
    /// the artifact is finalized
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.command(|reply| SessionCommand::Stop { reply }).await
    }

    /// Return to Idle from Captured or Failed
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.command(|reply| SessionCommand::Reset { reply }).await
    }

    /// Current observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    /// Subscribe to state transitions
    pub fn updates(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.clone()
    }

    /// Stop the runner task; pending capture state is torn down
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SessionCommand::Shutdown).await;
    }

    async fn command<F>(&self, make: F) -> Result<(), SessionError>
    where
        F: FnOnce(oneshot::Sender<Result<(), SessionError>>) -> SessionCommand,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }
}

/// Task that drives a [`RecordingSession`]
///
/// Owns the machine, both timer slots, the microphone backend, and the
/// chunk stream. A single `select!` loop consumes one input at a time,
/// so transitions never interleave; the watch publisher mirrors the
/// machine after every input.
pub struct SessionRunner {
    machine: RecordingSession,
    mic: Arc<Mutex<Box<dyn MicrophoneBackend>>>,
    commands: mpsc::Receiver<SessionCommand>,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    /// Chunk stream of the current recording, if attached
    chunk_rx: Option<mpsc::Receiver<AudioChunk>>,
    auto_stop: TimerSlot,
    hint_timer: TimerSlot,
    publisher: watch::Sender<SessionSnapshot>,
}

impl SessionRunner {
    /// Spawn the runner task and return its handle
    pub fn spawn(
        config: SessionConfig,
        mic: Box<dyn MicrophoneBackend>,
        picker: Box<dyn SuggestionPicker>,
    ) -> SessionHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (events_tx, events_rx) = mpsc::channel(64);

        info!(
            "Session {} using {} microphone backend",
            config.session_id,
            mic.name()
        );
        let machine = RecordingSession::new(config, picker);
        let (publisher, updates) = watch::channel(machine.snapshot());

        let runner = SessionRunner {
            machine,
            mic: Arc::new(Mutex::new(mic)),
            commands: command_rx,
            events_tx,
            events_rx,
            chunk_rx: None,
            auto_stop: TimerSlot::new("auto-stop"),
            hint_timer: TimerSlot::new("hint"),
            publisher,
        };

        tokio::spawn(runner.run());

        SessionHandle {
            commands: command_tx,
            updates,
        }
    }

    async fn run(mut self) {
        info!(
            "Session runner started: {}",
            self.machine.config().session_id
        );

        // The session is born idle, so the hint window opens now
        self.arm_hint_timer();

        loop {
            let input = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => Input::Command(command),
                    None => Input::HandlesDropped,
                },
                Some(event) = self.events_rx.recv() => Input::Event(event),
                chunk = next_chunk(&mut self.chunk_rx) => match chunk {
                    Some(chunk) => Input::Event(SessionEvent::ChunkAvailable(chunk)),
                    None => Input::StreamClosed,
                },
            };

            match input {
                Input::Command(SessionCommand::Start { reply }) => {
                    let outcome = self.machine.start();
                    let _ = reply.send(self.execute_outcome("start", outcome).await);
                }
                Input::Command(SessionCommand::Stop { reply }) => {
                    let outcome = self.machine.stop();
                    let _ = reply.send(self.execute_outcome("stop", outcome).await);
                }
                Input::Command(SessionCommand::Reset { reply }) => {
                    let outcome = self.machine.reset();
                    let _ = reply.send(self.execute_outcome("reset", outcome).await);
                }
                Input::Command(SessionCommand::Shutdown) => break,
                Input::HandlesDropped => {
                    debug!(
                        "Session {}: all handles dropped",
                        self.machine.config().session_id
                    );
                    break;
                }
                Input::Event(event) => {
                    debug!(
                        "Session {}: event {}",
                        self.machine.config().session_id,
                        event.kind()
                    );
                    let actions = self.machine.apply(event);
                    self.execute(actions).await;
                }
                Input::StreamClosed => {
                    // Device stopped delivering; stay in Recording and
                    // let the auto-stop timer finalize what we have
                    warn!(
                        "Session {}: audio stream closed mid-capture",
                        self.machine.config().session_id
                    );
                    self.chunk_rx = None;
                }
            }

            self.publish();
        }

        self.teardown().await;
    }

    async fn execute_outcome(
        &mut self,
        command: &'static str,
        outcome: Result<Vec<SessionAction>, SessionError>,
    ) -> Result<(), SessionError> {
        match outcome {
            Ok(actions) => {
                self.execute(actions).await;
                Ok(())
            }
            Err(err) => {
                debug!(
                    "Session {}: refused {}: {}",
                    self.machine.config().session_id,
                    command,
                    err
                );
                Err(err)
            }
        }
    }

    /// Execute machine actions in order
    ///
    /// Finalization feeds its outcome straight back into the machine,
    /// which may append further actions, hence the queue.
    async fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::RequestMicrophone => self.request_microphone(),
                SessionAction::AttachStream(stream) => {
                    debug!(
                        "Session {}: consuming chunks from {}",
                        self.machine.config().session_id,
                        stream.device
                    );
                    self.chunk_rx = Some(stream.chunks);
                }
                SessionAction::ArmAutoStop => {
                    if self.auto_stop.is_armed() {
                        warn!(
                            "Session {}: auto-stop timer already armed",
                            self.machine.config().session_id
                        );
                    }
                    let delay = self.machine.config().capture_duration;
                    self.auto_stop
                        .arm(delay, self.events_tx.clone(), SessionEvent::AutoStopElapsed);
                }
                SessionAction::CancelAutoStop => self.auto_stop.cancel(),
                SessionAction::ArmHintTimer => self.arm_hint_timer(),
                SessionAction::CancelHintTimer => self.hint_timer.cancel(),
                SessionAction::ReleaseMicrophone => {
                    self.chunk_rx = None;
                    let mut mic = self.mic.lock().await;
                    if let Err(e) = mic.release().await {
                        warn!(
                            "Session {}: failed to release microphone: {}",
                            self.machine.config().session_id,
                            e.detail()
                        );
                    }
                }
                SessionAction::FinalizeCapture { chunks } => {
                    let event = {
                        let mic = self.mic.lock().await;
                        match mic.finalize(&chunks) {
                            Ok(artifact) => SessionEvent::CaptureFinalized(artifact),
                            Err(err) => SessionEvent::CaptureFailed(err),
                        }
                    };
                    queue.extend(self.machine.apply(event));
                }
            }
        }
    }

    /// Ask the backend for the microphone off-loop; the outcome comes
    /// back as a permission event
    fn request_microphone(&mut self) {
        let mic = Arc::clone(&self.mic);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            let mut mic = mic.lock().await;
            match mic.request_access().await {
                Ok(stream) => {
                    if events
                        .send(SessionEvent::PermissionGranted(stream))
                        .await
                        .is_err()
                    {
                        // Runner gone before the grant landed; free the device
                        debug!("Releasing microphone granted after session closed");
                        if let Err(e) = mic.release().await {
                            warn!("Failed to release orphaned microphone: {}", e.detail());
                        }
                    }
                }
                Err(err) => {
                    let _ = events.send(SessionEvent::PermissionDenied(err)).await;
                }
            }
        });
    }

    fn arm_hint_timer(&mut self) {
        if self.hint_timer.is_armed() {
            warn!(
                "Session {}: hint timer already armed",
                self.machine.config().session_id
            );
        }
        let delay = self.machine.config().hint_delay;
        self.hint_timer
            .arm(delay, self.events_tx.clone(), SessionEvent::HintElapsed);
    }

    /// Mirror the machine into the watch channel, waking observers
    /// only when something observable changed
    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        self.publisher.send_if_modified(move |current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    async fn teardown(mut self) {
        info!(
            "Session runner stopping: {}",
            self.machine.config().session_id
        );
        if self.machine.status().is_active() {
            warn!(
                "Session {}: torn down with a capture in flight ({})",
                self.machine.config().session_id,
                self.machine.status()
            );
        }

        self.auto_stop.cancel();
        self.hint_timer.cancel();
        self.chunk_rx = None;

        // Stop accepting events so an in-flight permission task fails
        // its send and releases the device itself
        self.events_rx.close();

        let mut mic = self.mic.lock().await;
        if mic.is_capturing() {
            if let Err(e) = mic.release().await {
                warn!(
                    "Session {}: failed to release microphone on shutdown: {}",
                    self.machine.config().session_id,
                    e.detail()
                );
            }
        }
    }
}

/// Pending forever while no stream is attached, so the select arm
/// only completes with real chunk traffic
async fn next_chunk(rx: &mut Option<mpsc::Receiver<AudioChunk>>) -> Option<AudioChunk> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
