use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::models::audio_models::{AudioFormat, AudioSource};
use crate::models::error::CaptureError;
use crate::processing::pcm;
use crate::traits::sample_source::{InputStream, SampleSource};

/// Sine-tone source paced by the wall clock, as a real device would be.
///
/// Frames become readable at the configured sample rate from the moment the
/// stream opens. Stopping freezes the captured frame count; everything up to
/// that point is still handed out before `read_chunk` returns 0.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    frequency: f32,
    amplitude: f32,
    ready_delay: Duration,
    fail_after_frames: Option<u64>,
    available: bool,
    captured_frames: Arc<AtomicU64>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self {
            frequency: 440.0,
            amplitude: 0.5,
            ready_delay: Duration::ZERO,
            fail_after_frames: None,
            available: true,
            captured_frames: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tone(mut self, frequency: f32, amplitude: f32) -> Self {
        self.frequency = frequency;
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Simulate a device that takes `delay` to report ready.
    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    /// Fail reads with `ReadError` once `frames` have been delivered.
    pub fn failing_after(mut self, frames: u64) -> Self {
        self.fail_after_frames = Some(frames);
        self
    }

    /// A source whose device is missing.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Frames the device has captured in the most recent stream.
    ///
    /// Once the stream is stopped this is the exact number of frames a
    /// complete drain must deliver.
    pub fn captured_frames(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.captured_frames)
    }
}

impl SampleSource for SyntheticSource {
    type Stream = SyntheticStream;

    fn is_available(&self) -> bool {
        self.available
    }

    fn open(&self, format: &AudioFormat, ready_timeout: Duration) -> Result<SyntheticStream, CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable("synthetic device disabled".into()));
        }
        if self.ready_delay > ready_timeout {
            thread::sleep(ready_timeout);
            return Err(CaptureError::DeviceUnavailable(format!(
                "device not ready after {} ms",
                ready_timeout.as_millis()
            )));
        }
        thread::sleep(self.ready_delay);

        self.captured_frames.store(0, Ordering::SeqCst);
        log::debug!(
            "Synthetic stream opened: {} Hz, {} ch, {} Hz tone",
            format.sample_rate(),
            format.channels(),
            self.frequency
        );

        Ok(SyntheticStream {
            format: *format,
            frequency: self.frequency,
            amplitude: self.amplitude,
            started: Instant::now(),
            emitted_frames: 0,
            stop_at: None,
            fail_after_frames: self.fail_after_frames,
            captured_frames: Arc::clone(&self.captured_frames),
        })
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "synthetic".into(),
            name: format!("Synthetic {} Hz tone", self.frequency),
            is_default: false,
        }
    }
}

/// Open stream of a [`SyntheticSource`].
pub struct SyntheticStream {
    format: AudioFormat,
    frequency: f32,
    amplitude: f32,
    started: Instant,
    emitted_frames: u64,
    stop_at: Option<u64>,
    fail_after_frames: Option<u64>,
    captured_frames: Arc<AtomicU64>,
}

impl SyntheticStream {
    fn frames_due(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * f64::from(self.format.sample_rate())) as u64
    }

    fn fill(&mut self, buf: &mut [i16], frames: usize) {
        let channels = usize::from(self.format.channels());
        let rate = self.format.sample_rate() as f32;
        for (i, frame) in buf.chunks_exact_mut(channels).take(frames).enumerate() {
            let n = self.emitted_frames + i as u64;
            // Phase within one period keeps the f32 argument small on long captures.
            let phase = ((n as f64 * f64::from(self.frequency)) % f64::from(rate)) as f32 / rate;
            let sample = pcm::f32_to_i16(self.amplitude * (TAU * phase).sin());
            frame.fill(sample);
        }
        self.emitted_frames += frames as u64;
    }
}

impl InputStream for SyntheticStream {
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        let channels = usize::from(self.format.channels());
        let wanted = buf.len() / channels;
        if wanted == 0 {
            return Err(CaptureError::ReadError("read buffer smaller than one frame".into()));
        }
        if let Some(limit) = self.fail_after_frames {
            if self.emitted_frames >= limit {
                return Err(CaptureError::ReadError("synthetic device failure".into()));
            }
        }

        loop {
            if let Some(stop_at) = self.stop_at {
                let frames = (stop_at - self.emitted_frames).min(wanted as u64) as usize;
                self.fill(buf, frames);
                return Ok(frames * channels);
            }

            let due = self.frames_due();
            self.captured_frames.store(due, Ordering::SeqCst);
            if due >= self.emitted_frames + wanted as u64 {
                self.fill(buf, wanted);
                return Ok(wanted * channels);
            }

            let missing = self.emitted_frames + wanted as u64 - due;
            thread::sleep(Duration::from_secs_f64(
                missing as f64 / f64::from(self.format.sample_rate()),
            ));
        }
    }

    fn stop(&mut self) {
        if self.stop_at.is_some() {
            return;
        }
        let captured = self.frames_due().max(self.emitted_frames);
        self.stop_at = Some(captured);
        self.captured_frames.store(captured, Ordering::SeqCst);
        log::debug!(
            "Synthetic stream stopped with {} frames pending",
            captured - self.emitted_frames
        );
    }
}
