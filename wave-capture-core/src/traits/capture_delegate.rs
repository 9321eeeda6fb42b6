use crate::models::error::CaptureError;
use crate::models::recording_result::Artifact;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// All methods are called from the capture worker thread, not the caller's
/// thread. Implementations should marshal to their own context if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: CaptureState);

    /// Called when a session aborts.
    fn on_error(&self, error: &CaptureError);

    /// Called when the WAVE file is finalized.
    fn on_capture_finished(&self, artifact: &Artifact);
}
