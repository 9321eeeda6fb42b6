use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::audio_models::{AudioFormat, BITS_PER_SAMPLE};
use super::error::CaptureError;

/// Configuration for a recorder and the sessions it starts.
///
/// Deserializable from JSON; any missing field takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    /// Sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Bit depth for PCM output. Only 16 is accepted.
    pub bit_depth: u16,

    /// Number of interleaved channels (default: 2). Valid values: 1, 2.
    pub channels: u16,

    /// Target recording length in seconds. 0 records until stopped.
    pub duration_secs: u32,

    /// Directory where finished WAVE files are written.
    pub output_directory: PathBuf,

    /// Directory for the raw PCM capture while a session runs.
    pub scratch_directory: PathBuf,

    /// Interleaved samples requested per device read.
    pub read_chunk_samples: usize,

    /// How long to wait for the input device to report ready.
    pub open_timeout_ms: u64,

    /// How long a live device may go without delivering audio.
    pub read_timeout_ms: u64,

    /// Upper bound on draining buffered audio after a stop request.
    pub max_drain_ms: u64,

    /// Input device to use, or None for the host default.
    pub device_name: Option<String>,

    /// Write a `.metadata.json` sidecar next to each recording.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.bit_depth != BITS_PER_SAMPLE {
            return Err(format!("unsupported bit depth: {}", self.bit_depth));
        }
        if self.read_chunk_samples < usize::from(self.channels.max(1)) {
            return Err(format!(
                "read chunk of {} samples is smaller than one frame",
                self.read_chunk_samples
            ));
        }
        if self.open_timeout_ms == 0 {
            return Err("open timeout must be positive".into());
        }
        if self.read_timeout_ms == 0 {
            return Err("read timeout must be positive".into());
        }
        AudioFormat::new(self.sample_rate, self.channels).map_err(|e| e.to_string())?;
        Ok(())
    }

    /// The validated capture format.
    pub fn format(&self) -> Result<AudioFormat, CaptureError> {
        self.validate().map_err(CaptureError::InvalidConfiguration)?;
        AudioFormat::new(self.sample_rate, self.channels)
    }

    /// Read chunk size rounded down to whole frames.
    pub fn chunk_samples(&self) -> usize {
        let channels = usize::from(self.channels.max(1));
        (self.read_chunk_samples / channels).max(1) * channels
    }

    /// Recording target, or None when unbounded.
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(u64::from(self.duration_secs)))
    }

    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn max_drain(&self) -> Duration {
        Duration::from_millis(self.max_drain_ms)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: BITS_PER_SAMPLE,
            channels: 2,
            duration_secs: 0,
            output_directory: PathBuf::from("."),
            scratch_directory: std::env::temp_dir().join("wave-capture"),
            read_chunk_samples: 4096,
            open_timeout_ms: 2000,
            read_timeout_ms: 2000,
            max_drain_ms: 1000,
            device_name: None,
            write_metadata: true,
        }
    }
}
