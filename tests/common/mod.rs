// Shared test doubles for the session integration tests:
// a scripted microphone backend, a deterministic suggestion picker,
// and a counting navigator.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voicematch_capture::{
    encode_wav, AudioChunk, CaptureArtifact, CaptureError, MicStream, MicrophoneBackend,
    MicrophoneConfig, Navigator, SessionConfig, SessionSnapshot, SessionStatus, SuggestionPicker,
};

/// Outcome of the next microphone request
pub enum MicScript {
    /// Grant access; `chunks` are waiting in the stream immediately
    Grant { chunks: Vec<AudioChunk> },
    /// Refuse access with a classified error
    Deny(CaptureError),
}

/// Observable side of a [`ScriptedMic`] once it has moved into the runner
pub struct MicState {
    held: AtomicBool,
    releases: AtomicUsize,
    finalize_error: Mutex<Option<CaptureError>>,
    feed: Mutex<Option<mpsc::Sender<AudioChunk>>>,
}

impl MicState {
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Make the next finalize fail with `error`
    pub fn fail_next_finalize(&self, error: CaptureError) {
        *self.finalize_error.lock().unwrap() = Some(error);
    }

    /// Push a chunk into the currently granted stream
    pub fn send_chunk(&self, chunk: AudioChunk) {
        let feed = self.feed.lock().unwrap();
        let tx = feed.as_ref().expect("no granted stream to feed");
        tx.try_send(chunk).expect("stream buffer full");
    }

    /// Close the granted stream without a release, as an unplugged
    /// device would
    pub fn drop_stream(&self) {
        self.feed.lock().unwrap().take();
    }
}

/// Microphone backend with pre-programmed request outcomes
pub struct ScriptedMic {
    scripts: Mutex<VecDeque<MicScript>>,
    state: Arc<MicState>,
}

impl ScriptedMic {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            state: Arc::new(MicState {
                held: AtomicBool::new(false),
                releases: AtomicUsize::new(0),
                finalize_error: Mutex::new(None),
                feed: Mutex::new(None),
            }),
        }
    }

    /// Handle for assertions after the mic has moved into the runner
    pub fn state(&self) -> Arc<MicState> {
        Arc::clone(&self.state)
    }

    pub fn push_grant(&mut self, chunks: Vec<AudioChunk>) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(MicScript::Grant { chunks });
    }

    pub fn push_deny(&mut self, error: CaptureError) {
        self.scripts.lock().unwrap().push_back(MicScript::Deny(error));
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for ScriptedMic {
    async fn request_access(&mut self) -> Result<MicStream, CaptureError> {
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(MicScript::Grant { chunks }) => {
                let (tx, rx) = mpsc::channel(256);
                for chunk in chunks {
                    tx.try_send(chunk).expect("scripted chunks exceed buffer");
                }
                *self.state.feed.lock().unwrap() = Some(tx);
                self.state.held.store(true, Ordering::SeqCst);
                Ok(MicStream {
                    device: "scripted-mic".to_string(),
                    chunks: rx,
                })
            }
            Some(MicScript::Deny(error)) => Err(error),
            None => panic!("microphone requested with no script left"),
        }
    }

    async fn release(&mut self) -> Result<(), CaptureError> {
        self.state.held.store(false, Ordering::SeqCst);
        self.state.feed.lock().unwrap().take();
        self.state.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn finalize(&self, chunks: &[AudioChunk]) -> Result<CaptureArtifact, CaptureError> {
        if let Some(error) = self.state.finalize_error.lock().unwrap().take() {
            return Err(error);
        }
        encode_wav(chunks, &MicrophoneConfig::default())
    }

    fn is_capturing(&self) -> bool {
        self.state.is_held()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Picker that always returns the same index
pub struct FixedPicker(pub usize);

impl SuggestionPicker for FixedPicker {
    fn pick_index(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

/// Navigator that counts how often it was asked to move on
pub struct CountingNavigator(pub Arc<AtomicUsize>);

impl Navigator for CountingNavigator {
    fn open_matching(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// 100ms mono chunks at 16kHz with a constant tone
pub fn tone_chunks(count: usize) -> Vec<AudioChunk> {
    (0..count)
        .map(|i| AudioChunk {
            samples: vec![1000i16; 1600],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: (i as u64) * 100,
        })
        .collect()
}

/// Session config with the product timings and a fixed id
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        session_id: "test-session".to_string(),
        ..SessionConfig::default()
    }
}

/// Follow updates until the status matches, failing after 60s of
/// simulated time
pub async fn wait_for_status(
    updates: &mut watch::Receiver<SessionSnapshot>,
    status: SessionStatus,
) -> SessionSnapshot {
    let wait = async {
        loop {
            {
                let current = updates.borrow_and_update();
                if current.status == status {
                    return current.clone();
                }
            }
            updates.changed().await.expect("session closed while waiting");
        }
    };

    tokio::time::timeout(Duration::from_secs(60), wait)
        .await
        .unwrap_or_else(|_| panic!("session never reached {:?}", status))
}
