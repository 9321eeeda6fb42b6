use super::error::CaptureError;

/// Width of every captured sample. Only signed 16-bit PCM is supported.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Highest sample rate accepted by [`AudioFormat::new`].
///
/// The only hard limit: above it a stereo byte rate no longer fits the
/// 32-bit WAVE `byte_rate` field.
pub const MAX_SAMPLE_RATE: u32 = u32::MAX / 4;

/// Sample encoding tag. Linear PCM is the only encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    LinearPcm,
}

impl SampleEncoding {
    /// The WAVE `fmt ` format tag for this encoding.
    pub fn format_tag(self) -> u16 {
        match self {
            Self::LinearPcm => 1,
        }
    }
}

/// Immutable description of the PCM stream a session captures.
///
/// Channel count is 1 or 2 and the bit depth is fixed at 16, so a frame is
/// always a whole number of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    sample_rate: u32,
    channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported sample rate: {sample_rate}"
            )));
        }
        if ![1, 2].contains(&channels) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported channel count: {channels}"
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn bits_per_sample(&self) -> u16 {
        BITS_PER_SAMPLE
    }

    pub fn encoding(&self) -> SampleEncoding {
        SampleEncoding::LinearPcm
    }

    /// Bytes per interleaved frame (also the WAVE block align).
    pub fn bytes_per_frame(&self) -> u16 {
        self.channels * BITS_PER_SAMPLE / 8
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.bytes_per_frame())
    }

    /// Playback duration of `data_bytes` of raw PCM in this format.
    pub fn duration_secs(&self, data_bytes: u64) -> f64 {
        data_bytes as f64 / f64::from(self.byte_rate())
    }
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Counters collected by the capture loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    pub chunks_read: u64,
    pub samples_read: u64,
    pub bytes_written: u64,
    /// Chunks read after the stop request was observed.
    pub drain_chunks: u64,
    /// Set when the drain hit its deadline before the device ran dry.
    pub drain_truncated: bool,
}
