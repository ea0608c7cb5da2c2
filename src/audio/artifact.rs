use crate::audio::backend::{AudioChunk, MicrophoneConfig};
use crate::error::CaptureError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Cursor;
use uuid::Uuid;

/// Media type of finalized captures
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// A finalized, playable voice capture
///
/// Immutable once produced; the session hands out clones and the
/// downstream flow identifies it by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureArtifact {
    /// Artifact identity (one navigation per id downstream)
    pub id: Uuid,
    /// Complete WAV container bytes
    pub bytes: Vec<u8>,
    /// Media type of `bytes`
    pub mime_type: String,
    /// Audio duration in seconds
    pub duration_secs: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// When finalization happened
    pub captured_at: DateTime<Utc>,
}

impl CaptureArtifact {
    /// Serializable metadata view (bytes omitted)
    pub fn summary(&self) -> CaptureSummary {
        CaptureSummary {
            id: self.id,
            mime_type: self.mime_type.clone(),
            duration_secs: self.duration_secs,
            sample_rate: self.sample_rate,
            channels: self.channels,
            size_bytes: self.bytes.len(),
            captured_at: self.captured_at,
        }
    }
}

/// Artifact metadata for logs and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct CaptureSummary {
    pub id: Uuid,
    pub mime_type: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub size_bytes: usize,
    pub captured_at: DateTime<Utc>,
}

/// Encode buffered chunks into an in-memory WAV artifact
///
/// The WAV spec comes from the first chunk (devices keep their native
/// rate); `config` supplies it when the capture produced no chunks, so
/// an empty capture still yields a valid zero-length file.
pub fn encode_wav(
    chunks: &[AudioChunk],
    config: &MicrophoneConfig,
) -> Result<CaptureArtifact, CaptureError> {
    let (sample_rate, channels) = match chunks.first() {
        Some(chunk) => (chunk.sample_rate, chunk.channels),
        None => (config.preferred_sample_rate, config.channels),
    };

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec)
            .map_err(|e| CaptureError::Unknown(format!("WAV header: {}", e)))?;

        for chunk in chunks {
            for &sample in &chunk.samples {
                writer
                    .write_sample(sample)
                    .map_err(|e| CaptureError::Unknown(format!("WAV sample: {}", e)))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| CaptureError::Unknown(format!("WAV finalize: {}", e)))?;
    }

    let duration_secs: f64 = chunks.iter().map(|c| c.duration_secs()).sum();

    Ok(CaptureArtifact {
        id: Uuid::new_v4(),
        bytes: buffer.into_inner(),
        mime_type: WAV_MIME_TYPE.to_string(),
        duration_secs,
        sample_rate,
        channels,
        captured_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(samples: Vec<i16>, timestamp_ms: u64) -> AudioChunk {
        AudioChunk {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms,
        }
    }

    #[test]
    fn test_encode_empty_capture_is_valid_wav() {
        let artifact = encode_wav(&[], &MicrophoneConfig::default()).unwrap();

        assert_eq!(artifact.mime_type, WAV_MIME_TYPE);
        assert_eq!(artifact.duration_secs, 0.0);
        // Header-only WAV is still readable
        let reader = hound::WavReader::new(Cursor::new(artifact.bytes)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_encode_preserves_samples() {
        let chunks = vec![chunk(vec![1, 2, 3], 0), chunk(vec![4, 5], 100)];
        let artifact = encode_wav(&chunks, &MicrophoneConfig::default()).unwrap();

        let mut reader = hound::WavReader::new(Cursor::new(artifact.bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_spec_comes_from_first_chunk() {
        let chunks = vec![AudioChunk {
            samples: vec![0; 441],
            sample_rate: 44100,
            channels: 1,
            timestamp_ms: 0,
        }];
        let artifact = encode_wav(&chunks, &MicrophoneConfig::default()).unwrap();

        assert_eq!(artifact.sample_rate, 44100);
        assert!((artifact.duration_secs - 0.01).abs() < 1e-6);
    }
}
