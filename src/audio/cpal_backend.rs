use crate::audio::artifact::{encode_wav, CaptureArtifact};
use crate::audio::backend::{AudioChunk, MicStream, MicrophoneBackend, MicrophoneConfig};
use crate::error::CaptureError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Microphone backend over cpal
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated
/// capture thread for its whole lifetime. The thread reports the build
/// outcome over a oneshot, feeds chunks into a tokio channel from the
/// audio callback, and exits when the stop channel closes.
pub struct CpalBackend {
    config: MicrophoneConfig,
    capture: Option<CaptureThread>,
}

/// Handle to a running capture thread
struct CaptureThread {
    /// Dropping or firing this releases the stream
    stop: Option<oneshot::Sender<()>>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl CpalBackend {
    pub fn new(config: MicrophoneConfig) -> Self {
        Self {
            config,
            capture: None,
        }
    }
}

#[async_trait::async_trait]
impl MicrophoneBackend for CpalBackend {
    async fn request_access(&mut self) -> Result<MicStream, CaptureError> {
        if self.capture.is_some() {
            warn!("Microphone already held, releasing before re-acquiring");
            self.release().await?;
        }

        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let config = self.config.clone();
        let join = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || capture_thread(config, chunk_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn capture thread: {}", e)))?;

        // The thread reports either the device label or a classified error
        let device = match ready_rx.await {
            Ok(Ok(device)) => device,
            Ok(Err(err)) => {
                join_thread(join).await;
                return Err(err);
            }
            Err(_) => {
                join_thread(join).await;
                return Err(CaptureError::Unknown(
                    "capture thread exited before opening the device".into(),
                ));
            }
        };

        info!("Microphone acquired: {}", device);

        self.capture = Some(CaptureThread {
            stop: Some(stop_tx),
            join: Some(join),
        });

        Ok(MicStream {
            device,
            chunks: chunk_rx,
        })
    }

    async fn release(&mut self) -> Result<(), CaptureError> {
        let Some(mut capture) = self.capture.take() else {
            return Ok(());
        };

        if let Some(stop) = capture.stop.take() {
            let _ = stop.send(());
        }

        if let Some(join) = capture.join.take() {
            join_thread(join).await;
        }

        info!("Microphone released");
        Ok(())
    }

    fn finalize(&self, chunks: &[AudioChunk]) -> Result<CaptureArtifact, CaptureError> {
        encode_wav(chunks, &self.config)
    }

    fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Reap a finished capture thread without blocking the runtime
async fn join_thread(join: std::thread::JoinHandle<()>) {
    let outcome = tokio::task::spawn_blocking(move || join.join()).await;
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(_)) => warn!("Capture thread panicked"),
        Err(e) => warn!("Failed to reap capture thread: {}", e),
    }
}

/// Body of the capture thread: build the stream, report, hold until stop
fn capture_thread(
    config: MicrophoneConfig,
    chunks: mpsc::Sender<AudioChunk>,
    ready: oneshot::Sender<Result<String, CaptureError>>,
    stop: oneshot::Receiver<()>,
) {
    let (stream, device) = match build_stream(&config, chunks) {
        Ok(built) => built,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(classify_play_error(e)));
        return;
    }

    if ready.send(Ok(device)).is_err() {
        // Requester vanished; nobody will release us
        return;
    }

    // Park until released; the audio callback does all the work
    let _ = stop.blocking_recv();
    drop(stream);
    debug!("Capture thread stopped");
}

/// Open the default input device and wire its callback to the batcher
fn build_stream(
    config: &MicrophoneConfig,
    chunks: mpsc::Sender<AudioChunk>,
) -> Result<(cpal::Stream, String), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceNotFound)?;
    let label = device
        .name()
        .unwrap_or_else(|_| "unknown input device".to_string());

    let supported = device
        .default_input_config()
        .map_err(classify_config_error)?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    let source_rate = stream_config.sample_rate.0;
    let source_channels = stream_config.channels;
    debug!(
        "Opening input stream: {} ({} Hz, {} ch, {:?})",
        label, source_rate, source_channels, sample_format
    );

    let mut batcher = ChunkBatcher::new(source_rate, source_channels, config.chunk_ms, chunks);
    let err_fn = |e: cpal::StreamError| warn!("Microphone stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::I16 => device
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| batcher.push_i16(data),
                err_fn,
                None,
            )
            .map_err(classify_build_error)?,
        SampleFormat::F32 => device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| batcher.push_f32(data),
                err_fn,
                None,
            )
            .map_err(classify_build_error)?,
        other => {
            return Err(CaptureError::Unknown(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    };

    Ok((stream, label))
}

/// Downmixes interleaved input to mono and batches it into fixed
/// chunks for the session
struct ChunkBatcher {
    sample_rate: u32,
    source_channels: u16,
    samples_per_chunk: usize,
    pending: Vec<i16>,
    sent_samples: u64,
    tx: mpsc::Sender<AudioChunk>,
}

impl ChunkBatcher {
    fn new(
        sample_rate: u32,
        source_channels: u16,
        chunk_ms: u64,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Self {
        let samples_per_chunk = ((sample_rate as u64 * chunk_ms) / 1000).max(1) as usize;
        Self {
            sample_rate,
            source_channels,
            samples_per_chunk,
            pending: Vec::with_capacity(samples_per_chunk * 2),
            sent_samples: 0,
            tx,
        }
    }

    fn push_i16(&mut self, data: &[i16]) {
        if self.source_channels <= 1 {
            self.pending.extend_from_slice(data);
        } else {
            // Average interleaved frames down to mono
            for frame in data.chunks_exact(self.source_channels as usize) {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                self.pending.push((sum / frame.len() as i32) as i16);
            }
        }
        self.flush_full();
    }

    fn push_f32(&mut self, data: &[f32]) {
        if self.source_channels <= 1 {
            self.pending
                .extend(data.iter().map(|&s| f32_to_i16(s)));
        } else {
            for frame in data.chunks_exact(self.source_channels as usize) {
                let sum: f32 = frame.iter().sum();
                self.pending.push(f32_to_i16(sum / frame.len() as f32));
            }
        }
        self.flush_full();
    }

    /// Send every complete chunk in the pending buffer
    fn flush_full(&mut self) {
        while self.pending.len() >= self.samples_per_chunk {
            let rest = self.pending.split_off(self.samples_per_chunk);
            let samples = std::mem::replace(&mut self.pending, rest);

            let timestamp_ms = self.sent_samples * 1000 / self.sample_rate as u64;
            self.sent_samples += samples.len() as u64;

            let chunk = AudioChunk {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
                timestamp_ms,
            };

            match self.tx.try_send(chunk) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Consumer lagging; drop rather than stall the callback
                    warn!("Dropping audio chunk: session not keeping up");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Session gone; keep running until the thread is released
                }
            }
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn classify_config_error(e: cpal::DefaultStreamConfigError) -> CaptureError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        other => classify_detail(other.to_string()),
    }
}

fn classify_build_error(e: cpal::BuildStreamError) -> CaptureError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        other => classify_detail(other.to_string()),
    }
}

fn classify_play_error(e: cpal::PlayStreamError) -> CaptureError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        other => classify_detail(other.to_string()),
    }
}

/// cpal has no portable permission error; OS denials surface as
/// backend-specific errors, so classify from the message text
fn classify_detail(detail: String) -> CaptureError {
    let lower = detail.to_lowercase();
    if lower.contains("permission")
        || lower.contains("access denied")
        || lower.contains("not permitted")
        || lower.contains("unauthorized")
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Unknown(detail)
    }
}
