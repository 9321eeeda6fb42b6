use std::fs;
use std::io;
use std::path::Path;

use super::metadata;
use crate::models::error::CaptureError;

/// Delete a recording and its metadata sidecar.
///
/// A recording that is already gone yields [`CaptureError::NoArtifact`].
pub fn erase_recording(path: &Path) -> Result<(), CaptureError> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(CaptureError::NoArtifact),
        Err(e) => {
            return Err(CaptureError::StorageError(format!(
                "failed to delete {}: {}",
                path.display(),
                e
            )))
        }
    }

    if let Err(e) = metadata::remove_metadata(path) {
        log::warn!("Recording erased but sidecar remains: {}", e);
    }
    log::info!("Erased recording {}", path.display());
    Ok(())
}
