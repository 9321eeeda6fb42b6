use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for a recording: `recording.wav` → `recording.metadata.json`.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata next to the recording.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, CaptureError> {
    let path = sidecar_path(recording_path);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json).map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    log::debug!("Metadata written to {}", path.display());
    Ok(path)
}

/// Read the sidecar of a recording.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(sidecar_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}

/// Delete the sidecar of a recording, if there is one.
///
/// Returns whether a file was removed.
pub fn remove_metadata(recording_path: &Path) -> Result<bool, CaptureError> {
    match fs::remove_file(sidecar_path(recording_path)) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CaptureError::StorageError(format!("failed to delete metadata: {}", e))),
    }
}
