use std::path::Path;

use crate::models::error::CaptureError;

/// Playback trigger for a finished recording.
pub trait Player: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), CaptureError>;
}
