use std::time::Duration;

use crate::models::audio_models::{AudioFormat, AudioSource};
use crate::models::error::CaptureError;

/// Interface for hardware- or OS-backed audio input.
///
/// Implemented by:
/// - `CpalSampleSource` (wave-capture-cpal)
/// - `SyntheticSource` (tone generator for tests and demos)
pub trait SampleSource: Send + Sync {
    /// The open stream handed to the capture worker.
    type Stream: InputStream + 'static;

    /// Whether this source currently has a usable device.
    fn is_available(&self) -> bool;

    /// Acquire the device at `format` and start it.
    ///
    /// Waits at most `ready_timeout` for the device to report ready, then
    /// fails with [`CaptureError::DeviceUnavailable`].
    fn open(&self, format: &AudioFormat, ready_timeout: Duration) -> Result<Self::Stream, CaptureError>;

    /// Information about the device backing this source.
    fn device_info(&self) -> AudioSource;
}

/// A running input stream.
///
/// Dropping the stream releases the device, so it is released on every exit
/// path of the capture loop.
pub trait InputStream: Send {
    /// Blocking read of interleaved samples into `buf`.
    ///
    /// `buf.len()` is a whole number of frames and the returned sample count
    /// is too. Returns 0 only after [`InputStream::stop`] has been called and
    /// every frame the device buffered has been handed out.
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError>;

    /// Ask the device to stop capturing. Idempotent.
    ///
    /// Frames already captured remain readable through `read_chunk`.
    fn stop(&mut self);

    /// Release the device. Callable after `stop`.
    fn close(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}
