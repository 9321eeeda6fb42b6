//! cpal microphone input.
//!
//! `cpal::Stream` is not `Send` on every host, so the stream lives on a
//! dedicated device thread for its whole life. The device callback converts
//! each buffer to interleaved i16 and forwards it over a channel; the capture
//! worker pulls from that channel through [`InputStream::read_chunk`].
//!
//! ```text
//! [device thread: cpal callback] ──Vec<i16>──→ [channel] ──→ [CpalInputStream] → capture loop
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use wave_capture_core::models::audio_models::{AudioFormat, AudioSource};
use wave_capture_core::models::error::CaptureError;
use wave_capture_core::processing::pcm;
use wave_capture_core::processing::sample_queue::SampleQueue;
use wave_capture_core::traits::sample_source::{InputStream, SampleSource};

use crate::device_enumerator::DeviceEnumerator;

/// Default for how long a live device may stay silent before a read fails.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the device thread re-checks its stop flag while parked.
const PARK_INTERVAL: Duration = Duration::from_millis(50);

/// Message from the device callback to the reader.
#[derive(Debug)]
enum DeviceMessage {
    Samples(Vec<i16>),
    Failed(String),
}

/// Microphone capture through the default cpal host.
pub struct CpalSampleSource {
    device_name: Option<String>,
    read_timeout: Duration,
}

impl CpalSampleSource {
    /// Capture from the host's default input device.
    pub fn default_device() -> Self {
        Self {
            device_name: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Capture from the input device with this exact name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl SampleSource for CpalSampleSource {
    type Stream = CpalInputStream;

    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_input_device(self.device_name.as_deref())
            .is_ok()
    }

    fn open(&self, format: &AudioFormat, ready_timeout: Duration) -> Result<CpalInputStream, CaptureError> {
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let (data_tx, data_rx) = unbounded::<DeviceMessage>();
        let running = Arc::new(AtomicBool::new(true));

        let device_name = self.device_name.clone();
        let thread_format = *format;
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("cpal-input".into())
            .spawn(move || device_thread(device_name, thread_format, data_tx, ready_tx, thread_running))
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn device thread: {}", e)))?;

        match ready_rx.recv_timeout(ready_timeout) {
            Ok(Ok(())) => {
                log::info!(
                    "Input device ready: {} Hz, {} ch",
                    format.sample_rate(),
                    format.channels()
                );
                Ok(CpalInputStream {
                    data_rx,
                    pending: SampleQueue::with_capacity(usize::from(format.channels()) * 4096),
                    channels: usize::from(format.channels()),
                    read_timeout: self.read_timeout,
                    running,
                    stopped: false,
                    device_thread: Some(handle),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                // The thread may still be inside the host API; let it exit on its own.
                running.store(false, Ordering::SeqCst);
                handle.thread().unpark();
                Err(CaptureError::DeviceUnavailable(format!(
                    "device not ready after {} ms",
                    ready_timeout.as_millis()
                )))
            }
        }
    }

    fn device_info(&self) -> AudioSource {
        let enumerator = DeviceEnumerator::new();
        let default_name = enumerator.default_input_name();
        let name = self
            .device_name
            .clone()
            .or_else(|| default_name.clone())
            .unwrap_or_else(|| "Default Input".into());
        AudioSource {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        }
    }
}

/// Owns the cpal stream from build to drop.
///
/// Dropping the stream drops the callback and its channel senders, which is
/// how the reader learns that no more audio will arrive.
fn device_thread(
    device_name: Option<String>,
    format: AudioFormat,
    data_tx: Sender<DeviceMessage>,
    ready_tx: Sender<Result<(), CaptureError>>,
    running: Arc<AtomicBool>,
) {
    let stream = match build_stream(device_name.as_deref(), &format, data_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
            "failed to start input stream: {}",
            e
        ))));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        log::warn!("Input device became ready after the caller gave up");
        return;
    }

    while running.load(Ordering::SeqCst) {
        thread::park_timeout(PARK_INTERVAL);
    }

    if let Err(e) = stream.pause() {
        log::debug!("Failed to pause input stream: {}", e);
    }
    drop(stream);
    log::debug!("Input device released");
}

fn build_stream(device_name: Option<&str>, format: &AudioFormat, data_tx: Sender<DeviceMessage>) -> Result<Stream, CaptureError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let ranges: Vec<ConfigRange> = device
        .supported_input_configs()
        .map_err(|e| CaptureError::DeviceUnavailable(format!("no supported input config: {}", e)))?
        .map(|range| ConfigRange {
            channels: range.channels(),
            min_rate: range.min_sample_rate().0,
            max_rate: range.max_sample_rate().0,
            sample_format: range.sample_format(),
        })
        .collect();
    let sample_format = choose_sample_format(&ranges, format)?;

    let config = StreamConfig {
        channels: format.channels(),
        sample_rate: cpal::SampleRate(format.sample_rate()),
        buffer_size: cpal::BufferSize::Default,
    };

    log::debug!(
        "Building input stream: {} Hz, {} ch, device format {:?}",
        format.sample_rate(),
        format.channels(),
        sample_format
    );

    match sample_format {
        SampleFormat::I16 => build_stream_typed(&device, &config, data_tx, i16_samples),
        SampleFormat::U16 => build_stream_typed(&device, &config, data_tx, u16_samples),
        SampleFormat::F32 => build_stream_typed(&device, &config, data_tx, f32_samples),
        other => Err(CaptureError::DeviceUnavailable(format!(
            "unsupported device sample format: {:?}",
            other
        ))),
    }
}

/// One supported input configuration range of a device.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ConfigRange {
    channels: u16,
    min_rate: u32,
    max_rate: u32,
    sample_format: SampleFormat,
}

impl ConfigRange {
    fn covers(&self, format: &AudioFormat) -> bool {
        self.channels == format.channels() && (self.min_rate..=self.max_rate).contains(&format.sample_rate())
    }
}

/// Native sample types we can read, best first. i16 needs no conversion.
const PREFERRED_FORMATS: [SampleFormat; 3] = [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16];

/// Pick the device sample type for `format`, or explain what the device offers.
fn choose_sample_format(ranges: &[ConfigRange], format: &AudioFormat) -> Result<SampleFormat, CaptureError> {
    let covering: Vec<&ConfigRange> = ranges.iter().filter(|range| range.covers(format)).collect();
    if let Some(sample_format) = PREFERRED_FORMATS
        .iter()
        .copied()
        .find(|preferred| covering.iter().any(|range| range.sample_format == *preferred))
    {
        return Ok(sample_format);
    }

    let offered = if ranges.is_empty() {
        "none".to_string()
    } else {
        ranges
            .iter()
            .map(|r| format!("{} ch {}-{} Hz {:?}", r.channels, r.min_rate, r.max_rate, r.sample_format))
            .collect::<Vec<_>>()
            .join(", ")
    };
    Err(CaptureError::DeviceUnavailable(format!(
        "device does not support {} Hz, {} ch in a readable sample format (supports: {})",
        format.sample_rate(),
        format.channels(),
        offered
    )))
}

fn build_stream_typed<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    data_tx: Sender<DeviceMessage>,
    convert: fn(&[T]) -> Vec<i16>,
) -> Result<Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
{
    let error_tx = data_tx.clone();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let _ = data_tx.send(DeviceMessage::Samples(convert(data)));
            },
            move |err| {
                log::error!("Input stream error: {}", err);
                let _ = error_tx.send(DeviceMessage::Failed(err.to_string()));
            },
            None,
        )
        .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to build input stream: {}", e)))
}

/// Native 16-bit samples are forwarded untouched.
fn i16_samples(data: &[i16]) -> Vec<i16> {
    data.to_vec()
}

/// Offset-binary to two's complement: 32768 is silence.
fn u16_samples(data: &[u16]) -> Vec<i16> {
    data.iter().map(|&s| i16::from_sample(s)).collect()
}

fn f32_samples(data: &[f32]) -> Vec<i16> {
    data.iter().map(|&s| pcm::f32_to_i16(s)).collect()
}

/// Open cpal input stream handed to the capture worker.
pub struct CpalInputStream {
    data_rx: Receiver<DeviceMessage>,
    pending: SampleQueue,
    channels: usize,
    read_timeout: Duration,
    running: Arc<AtomicBool>,
    stopped: bool,
    device_thread: Option<thread::JoinHandle<()>>,
}

impl CpalInputStream {
    fn release(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.device_thread.as_ref() {
            handle.thread().unpark();
        }
    }
}

impl InputStream for CpalInputStream {
    fn read_chunk(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
        let capacity = buf.len() / self.channels * self.channels;
        if capacity == 0 {
            return Err(CaptureError::ReadError("read buffer smaller than one frame".into()));
        }

        loop {
            let whole = self.pending.len() / self.channels * self.channels;
            if whole > 0 {
                let take = whole.min(capacity);
                return Ok(self.pending.pop_into(&mut buf[..take]));
            }

            match self.data_rx.recv_timeout(self.read_timeout) {
                Ok(DeviceMessage::Samples(samples)) => self.pending.push(&samples),
                Ok(DeviceMessage::Failed(message)) => {
                    if !self.stopped {
                        return Err(CaptureError::ReadError(message));
                    }
                    log::debug!("Ignoring stream error during drain: {}", message);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stopped {
                        log::warn!("Device did not release within {} ms", self.read_timeout.as_millis());
                        return Ok(0);
                    }
                    return Err(CaptureError::ReadError(format!(
                        "no audio from device for {} ms",
                        self.read_timeout.as_millis()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if self.stopped {
                        if !self.pending.is_empty() {
                            log::debug!("Dropping {} samples of a partial frame", self.pending.len());
                            self.pending.clear();
                        }
                        return Ok(0);
                    }
                    return Err(CaptureError::ReadError("input device disconnected".into()));
                }
            }
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.release();
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        self.release();
        if let Some(handle) = self.device_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_over(rx: Receiver<DeviceMessage>, channels: usize, read_timeout: Duration) -> CpalInputStream {
        CpalInputStream {
            data_rx: rx,
            pending: SampleQueue::new(),
            channels,
            read_timeout,
            running: Arc::new(AtomicBool::new(true)),
            stopped: false,
            device_thread: None,
        }
    }

    #[test]
    fn native_i16_samples_pass_through_unchanged() {
        let samples = [0i16, 1, -1, 2, 100, 12345, i16::MAX, i16::MIN];
        assert_eq!(i16_samples(&samples), samples.to_vec());
    }

    #[test]
    fn u16_samples_shift_to_signed() {
        assert_eq!(
            u16_samples(&[32768, 32769, 32767, 0, u16::MAX]),
            vec![0, 1, -1, i16::MIN, i16::MAX]
        );
    }

    #[test]
    fn f32_samples_are_scaled_and_clamped() {
        assert_eq!(f32_samples(&[0.0, 1.0, -1.0, 3.0]), vec![0, i16::MAX, -i16::MAX, i16::MAX]);
    }

    fn range(channels: u16, min_rate: u32, max_rate: u32, sample_format: SampleFormat) -> ConfigRange {
        ConfigRange {
            channels,
            min_rate,
            max_rate,
            sample_format,
        }
    }

    #[test]
    fn prefers_native_i16_when_offered() {
        let format = AudioFormat::new(44100, 2).unwrap();
        let ranges = [
            range(2, 8000, 96000, SampleFormat::F32),
            range(2, 8000, 96000, SampleFormat::I16),
        ];
        assert_eq!(choose_sample_format(&ranges, &format), Ok(SampleFormat::I16));
    }

    #[test]
    fn ignores_ranges_that_miss_rate_or_channels() {
        let format = AudioFormat::new(16000, 1).unwrap();
        let ranges = [
            range(2, 8000, 48000, SampleFormat::I16),
            range(1, 44100, 48000, SampleFormat::I16),
            range(1, 8000, 48000, SampleFormat::F32),
        ];
        assert_eq!(choose_sample_format(&ranges, &format), Ok(SampleFormat::F32));
    }

    #[test]
    fn unsupported_format_names_what_device_offers() {
        let format = AudioFormat::new(44100, 2).unwrap();
        let ranges = [range(1, 48000, 48000, SampleFormat::F32)];
        match choose_sample_format(&ranges, &format) {
            Err(CaptureError::DeviceUnavailable(message)) => {
                assert!(message.contains("44100 Hz, 2 ch"));
                assert!(message.contains("1 ch 48000-48000 Hz F32"));
            }
            other => panic!("expected DeviceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn unreadable_sample_types_are_skipped() {
        let format = AudioFormat::new(48000, 1).unwrap();
        let ranges = [range(1, 48000, 48000, SampleFormat::I32)];
        assert!(matches!(
            choose_sample_format(&ranges, &format),
            Err(CaptureError::DeviceUnavailable(_))
        ));
    }

    #[test]
    fn serves_buffered_samples_in_order() {
        let (tx, rx) = unbounded();
        let mut stream = stream_over(rx, 2, Duration::from_millis(100));
        tx.send(DeviceMessage::Samples(vec![1, 2, 3, 4])).unwrap();
        tx.send(DeviceMessage::Samples(vec![5, 6])).unwrap();

        let mut buf = [0i16; 4];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[5, 6]);
    }

    #[test]
    fn splits_large_buffers_into_chunks() {
        let (tx, rx) = unbounded();
        let mut stream = stream_over(rx, 2, Duration::from_millis(100));
        tx.send(DeviceMessage::Samples((0..10).collect())).unwrap();

        // Odd-sized buffers are trimmed to whole frames.
        let mut buf = [0i16; 5];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[8, 9]);
    }

    #[test]
    fn silent_live_device_is_read_error() {
        let (_tx, rx) = unbounded::<DeviceMessage>();
        let mut stream = stream_over(rx, 1, Duration::from_millis(20));
        let mut buf = [0i16; 8];
        assert!(matches!(stream.read_chunk(&mut buf), Err(CaptureError::ReadError(_))));
    }

    #[test]
    fn disconnect_while_live_is_read_error() {
        let (tx, rx) = unbounded::<DeviceMessage>();
        let mut stream = stream_over(rx, 1, Duration::from_millis(100));
        drop(tx);
        let mut buf = [0i16; 8];
        assert!(matches!(stream.read_chunk(&mut buf), Err(CaptureError::ReadError(_))));
    }

    #[test]
    fn stream_error_is_read_error() {
        let (tx, rx) = unbounded();
        let mut stream = stream_over(rx, 1, Duration::from_millis(100));
        tx.send(DeviceMessage::Failed("device unplugged".into())).unwrap();
        let mut buf = [0i16; 8];
        assert_eq!(
            stream.read_chunk(&mut buf),
            Err(CaptureError::ReadError("device unplugged".into()))
        );
    }

    #[test]
    fn drains_after_stop_then_reports_zero() {
        let (tx, rx) = unbounded();
        let mut stream = stream_over(rx, 2, Duration::from_millis(100));
        tx.send(DeviceMessage::Samples(vec![1, 1, 2, 2])).unwrap();
        tx.send(DeviceMessage::Samples(vec![3, 3])).unwrap();

        stream.stop();
        stream.stop();
        assert!(!stream.running.load(Ordering::SeqCst));
        drop(tx);

        let mut buf = [0i16; 16];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 4);
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 2);
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 0);
    }

    #[test]
    fn stopped_device_that_never_releases_ends_on_timeout() {
        let (_tx, rx) = unbounded::<DeviceMessage>();
        let mut stream = stream_over(rx, 1, Duration::from_millis(20));
        stream.stop();
        let mut buf = [0i16; 8];
        assert_eq!(stream.read_chunk(&mut buf).unwrap(), 0);
    }
}
