use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::{AudioFormat, CaptureSessionDiagnostics};
use crate::processing::wav_format::WAV_HEADER_SIZE;

/// A finished WAVE recording, owned by the caller once the session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_path: PathBuf,
    pub format: AudioFormat,
    /// Length of the PCM payload (the `data` chunk size).
    pub data_bytes: u64,
    pub duration_secs: f64,
    /// SHA-256 of the complete file, lowercase hex.
    pub checksum: String,
    pub diagnostics: CaptureSessionDiagnostics,
}

impl Artifact {
    /// Size of the file on disk: header plus payload.
    pub fn file_size(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.data_bytes
    }

    pub fn exists(&self) -> bool {
        self.file_path.is_file()
    }
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub data_bytes: u64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn for_artifact(artifact: &Artifact) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: artifact.file_path.to_string_lossy().to_string(),
            duration_secs: artifact.duration_secs,
            sample_rate: artifact.format.sample_rate(),
            channels: artifact.format.channels(),
            bits_per_sample: artifact.format.bits_per_sample(),
            data_bytes: artifact.data_bytes,
            checksum: artifact.checksum.clone(),
        }
    }
}
