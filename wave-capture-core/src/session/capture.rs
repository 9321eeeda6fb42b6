use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;

use super::cancel::CancelToken;
use super::watchdog::Watchdog;
use crate::models::audio_models::{AudioFormat, CaptureSessionDiagnostics};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{Artifact, RecordingMetadata};
use crate::models::state::CaptureState;
use crate::processing::pcm;
use crate::storage::metadata;
use crate::storage::raw_sink::RawSink;
use crate::storage::wave_encoder::WaveEncoder;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::media_indexer::{LogIndexer, MediaIndexer};
use crate::traits::sample_source::{InputStream, SampleSource};

/// Everything a single session needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub format: AudioFormat,
    /// Where the finished WAVE file is written.
    pub destination: PathBuf,
    /// Target length; `None` records until stopped.
    pub duration: Option<Duration>,
    /// Interleaved samples per device read.
    pub chunk_samples: usize,
    pub open_timeout: Duration,
    pub max_drain: Duration,
    pub write_metadata: bool,
}

impl SessionRequest {
    pub fn new(format: AudioFormat, destination: PathBuf) -> Self {
        Self {
            format,
            destination,
            duration: None,
            chunk_samples: 4096,
            open_timeout: Duration::from_secs(2),
            max_drain: Duration::from_secs(1),
            write_metadata: false,
        }
    }

    pub fn from_config(config: &CaptureConfiguration, destination: PathBuf) -> Result<Self, CaptureError> {
        Ok(Self {
            format: config.format()?,
            destination,
            duration: config.duration(),
            chunk_samples: config.chunk_samples(),
            open_timeout: config.open_timeout(),
            max_drain: config.max_drain(),
            write_metadata: config.write_metadata,
        })
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration.filter(|d| !d.is_zero());
        self
    }

    /// Chunk size rounded down to whole frames, never below one frame.
    fn frame_aligned_chunk(&self) -> usize {
        let channels = usize::from(self.format.channels());
        (self.chunk_samples / channels).max(1) * channels
    }
}

/// State cell shared by the session, its handles, and the worker thread.
#[derive(Clone)]
struct SharedState {
    state: Arc<Mutex<CaptureState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl SharedState {
    fn get(&self) -> CaptureState {
        *self.state.lock()
    }

    fn set(&self, new_state: CaptureState) {
        *self.state.lock() = new_state;
        log::debug!("Capture state: {}", new_state.label());
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(new_state);
        }
    }

    /// Atomically move `Idle → Recording`.
    fn claim(&self) -> Result<(), CaptureError> {
        {
            let mut state = self.state.lock();
            if state.is_active() {
                return Err(CaptureError::SessionActive);
            }
            *state = CaptureState::Recording;
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(CaptureState::Recording);
        }
        Ok(())
    }
}

/// Drives a [`SampleSource`] on a dedicated worker thread and turns the
/// capture into a WAVE file.
///
/// Data flow:
/// ```text
/// [SampleSource] → read_chunk → [i16 → LE bytes] → [RawSink]
///                                                      │ finalize
///                                                      ▼
///                                   [WaveEncoder] → destination.wav
/// ```
///
/// At most one session is active at a time. The worker owns the open stream
/// and the raw sink; callers only interact with it through the returned
/// [`SessionHandle`].
pub struct CaptureSession<S: SampleSource> {
    source: S,
    shared: SharedState,
    indexer: Arc<dyn MediaIndexer>,
    encoder: WaveEncoder,
}

impl<S: SampleSource> CaptureSession<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            shared: SharedState {
                state: Arc::new(Mutex::new(CaptureState::Idle)),
                delegate: None,
            },
            indexer: Arc::new(LogIndexer),
            encoder: WaveEncoder::new(),
        }
    }

    /// Install the delegate. Takes effect for sessions started afterwards.
    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.shared.delegate = Some(delegate);
    }

    pub fn set_indexer(&mut self, indexer: Arc<dyn MediaIndexer>) {
        self.indexer = indexer;
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> CaptureState {
        self.shared.get()
    }

    pub fn is_recording(&self) -> bool {
        self.shared.get().is_recording()
    }

    /// Open the source and start capturing into `sink`.
    ///
    /// Transitions `Idle → Recording`. Fails with
    /// [`CaptureError::SessionActive`] if another session has not yet
    /// returned to `Idle`. If the session cannot start, `sink` is discarded
    /// and the state is left at `Idle`.
    pub fn start<K>(&self, request: SessionRequest, mut sink: K) -> Result<SessionHandle, CaptureError>
    where
        K: RawSink + 'static,
    {
        if let Err(e) = self.shared.claim() {
            sink.discard();
            return Err(e);
        }

        let stream = match self.source.open(&request.format, request.open_timeout) {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("Failed to open input device: {}", e);
                sink.discard();
                self.shared.set(CaptureState::Idle);
                return Err(e);
            }
        };

        let cancel = CancelToken::new();
        let watchdog = match request.duration {
            Some(limit) => {
                let token = cancel.clone();
                let state = Arc::clone(&self.shared.state);
                let armed = Watchdog::arm(limit, move || {
                    if state.lock().is_recording() {
                        log::info!("Target duration reached, stopping capture");
                        token.cancel();
                    }
                });
                match armed {
                    Ok(watchdog) => Some(watchdog),
                    Err(e) => {
                        stream.close();
                        sink.discard();
                        self.shared.set(CaptureState::Idle);
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        log::info!(
            "Capture started: {} Hz, {} ch, target {}",
            request.format.sample_rate(),
            request.format.channels(),
            request
                .duration
                .map(|d| format!("{:.1}s", d.as_secs_f64()))
                .unwrap_or_else(|| "unbounded".into())
        );

        let (done_tx, done_rx) = bounded(1);
        let worker = Worker {
            request,
            cancel: cancel.clone(),
            shared: self.shared.clone(),
            indexer: Arc::clone(&self.indexer),
            encoder: self.encoder.clone(),
        };

        let shared = self.shared.clone();
        let handle = thread::Builder::new()
            .name("wave-capture".into())
            .spawn(move || {
                let outcome = worker.run(stream, sink, watchdog);
                let _ = done_tx.send(outcome);
            })
            .map_err(|e| {
                shared.set(CaptureState::Idle);
                CaptureError::CaptureFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        Ok(SessionHandle {
            cancel,
            state: Arc::clone(&self.shared.state),
            done_rx,
            worker: Some(handle),
            reported: false,
        })
    }
}

/// Caller-side handle to a running session.
///
/// Dropping the handle requests a stop and waits for the worker to finish.
pub struct SessionHandle {
    cancel: CancelToken,
    state: Arc<Mutex<CaptureState>>,
    done_rx: Receiver<Result<Artifact, CaptureError>>,
    worker: Option<thread::JoinHandle<()>>,
    reported: bool,
}

impl SessionHandle {
    /// Ask the worker to stop after draining buffered audio. Idempotent.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// A clone of the stop signal for use on another thread.
    pub fn stop_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> CaptureState {
        *self.state.lock()
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// The session outcome if it has finished. Reported once.
    pub fn try_wait(&mut self) -> Option<Result<Artifact, CaptureError>> {
        if self.reported {
            return None;
        }
        match self.done_rx.try_recv() {
            Ok(outcome) => Some(self.complete(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.complete(Err(worker_lost()))),
        }
    }

    /// Wait up to `timeout` for the outcome. Reported once.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<Artifact, CaptureError>> {
        if self.reported {
            return None;
        }
        match self.done_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(self.complete(outcome)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.complete(Err(worker_lost()))),
        }
    }

    /// Block until the session finishes.
    pub fn wait(mut self) -> Result<Artifact, CaptureError> {
        if self.reported {
            return Err(worker_lost());
        }
        let outcome = self.done_rx.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.complete(outcome)
    }

    fn complete(&mut self, outcome: Result<Artifact, CaptureError>) -> Result<Artifact, CaptureError> {
        self.reported = true;
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        outcome
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.cancel.cancel();
            let _ = handle.join();
        }
    }
}

fn worker_lost() -> CaptureError {
    CaptureError::CaptureFailed("capture worker exited without reporting".into())
}

/// The worker-thread half of a session.
struct Worker {
    request: SessionRequest,
    cancel: CancelToken,
    shared: SharedState,
    indexer: Arc<dyn MediaIndexer>,
    encoder: WaveEncoder,
}

impl Worker {
    fn run<T, K>(self, mut stream: T, mut sink: K, watchdog: Option<Watchdog>) -> Result<Artifact, CaptureError>
    where
        T: InputStream,
        K: RawSink,
    {
        let captured = self.capture(&mut stream, &mut sink);

        if let Some(watchdog) = watchdog {
            watchdog.disarm();
        }
        stream.close();

        let outcome = captured.and_then(|diagnostics| self.finish(&mut sink, diagnostics));
        // The raw capture is never needed past this point.
        sink.discard();
        self.shared.set(CaptureState::Idle);

        match &outcome {
            Ok(artifact) => {
                log::info!(
                    "Capture complete: {} ({:.2}s, {} bytes)",
                    artifact.file_path.display(),
                    artifact.duration_secs,
                    artifact.file_size()
                );
                if let Some(ref delegate) = self.shared.delegate {
                    delegate.on_capture_finished(artifact);
                }
            }
            Err(e) => {
                log::error!("Capture aborted: {}", e);
                if let Some(ref delegate) = self.shared.delegate {
                    delegate.on_error(e);
                }
            }
        }
        outcome
    }

    /// Read until stopped and drained, appending every chunk to the sink.
    fn capture<T, K>(&self, stream: &mut T, sink: &mut K) -> Result<CaptureSessionDiagnostics, CaptureError>
    where
        T: InputStream,
        K: RawSink,
    {
        let mut samples = vec![0i16; self.request.frame_aligned_chunk()];
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        let mut diagnostics = CaptureSessionDiagnostics::default();
        let mut drain_deadline: Option<Instant> = None;

        loop {
            if drain_deadline.is_none() && self.cancel.is_cancelled() {
                stream.stop();
                drain_deadline = Some(Instant::now() + self.request.max_drain);
                log::debug!("Device stopped, draining buffered audio");
            }

            let count = stream.read_chunk(&mut samples)?;
            if count == 0 {
                if drain_deadline.is_some() {
                    break;
                }
                thread::yield_now();
                continue;
            }

            bytes.clear();
            pcm::write_le_bytes(&samples[..count], &mut bytes);
            sink.append(&bytes)
                .map_err(|e| CaptureError::CaptureFailed(format!("failed to write raw audio: {}", e)))?;

            diagnostics.chunks_read += 1;
            diagnostics.samples_read += count as u64;
            diagnostics.bytes_written += bytes.len() as u64;

            if let Some(deadline) = drain_deadline {
                diagnostics.drain_chunks += 1;
                if Instant::now() >= deadline {
                    log::warn!(
                        "Drain exceeded {} ms, dropping remaining device buffer",
                        self.request.max_drain.as_millis()
                    );
                    diagnostics.drain_truncated = true;
                    break;
                }
            }
        }

        Ok(diagnostics)
    }

    /// Close the raw sink and encode it into the destination WAVE file.
    fn finish<K: RawSink>(&self, sink: &mut K, diagnostics: CaptureSessionDiagnostics) -> Result<Artifact, CaptureError> {
        self.shared.set(CaptureState::Stopping);
        let raw = sink
            .finalize()
            .map_err(|e| CaptureError::CaptureFailed(format!("failed to finalize raw capture: {}", e)))?;

        self.shared.set(CaptureState::Finalizing);
        let format = self.request.format;
        let encoded = self.encoder.encode(&raw.path, &format, &self.request.destination)?;

        let artifact = Artifact {
            file_path: encoded.path,
            format,
            data_bytes: encoded.data_bytes,
            duration_secs: format.duration_secs(encoded.data_bytes),
            checksum: encoded.checksum,
            diagnostics,
        };

        if let Err(e) = self.indexer.index(&artifact.file_path) {
            log::warn!("Media indexing failed: {}", e);
        }
        if self.request.write_metadata {
            if let Err(e) = metadata::write_metadata(&RecordingMetadata::for_artifact(&artifact), &artifact.file_path) {
                log::warn!("Recording saved without metadata: {}", e);
            }
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::EncodeError;
    use crate::processing::wav_format::WAV_HEADER_SIZE;
    use crate::sources::synthetic::SyntheticSource;
    use crate::storage::raw_sink::{FileRawSink, RawCapture};
    use approx::assert_relative_eq;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(10);

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<CaptureState>>,
        errors: Mutex<Vec<CaptureError>>,
        finished: AtomicUsize,
    }

    impl CaptureDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: CaptureState) {
            self.states.lock().push(state);
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }

        fn on_capture_finished(&self, _artifact: &Artifact) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Stream that never runs dry, or one that never delivers anything.
    struct ScriptedSource {
        endless: bool,
    }

    struct ScriptedStream {
        endless: bool,
        stopped: bool,
    }

    impl SampleSource for ScriptedSource {
        type Stream = ScriptedStream;

        fn is_available(&self) -> bool {
            true
        }

        fn open(&self, _format: &AudioFormat, _ready_timeout: Duration) -> Result<ScriptedStream, CaptureError> {
            Ok(ScriptedStream {
                endless: self.endless,
                stopped: false,
            })
        }

        fn device_info(&self) -> crate::models::audio_models::AudioSource {
            crate::models::audio_models::AudioSource {
                id: "scripted".into(),
                name: "Scripted".into(),
                is_default: false,
            }
        }
    }

    impl InputStream for ScriptedStream {
        fn read_chunk(&mut self, buf: &mut [i16]) -> Result<usize, CaptureError> {
            thread::sleep(Duration::from_millis(1));
            if self.endless {
                buf.fill(1);
                return Ok(buf.len());
            }
            Ok(0)
        }

        fn stop(&mut self) {
            self.stopped = true;
        }
    }

    /// Sink that fails after a number of appends and records discards.
    struct FailingSink {
        appends_left: usize,
        discarded: Arc<AtomicBool>,
    }

    impl RawSink for FailingSink {
        fn append(&mut self, _bytes: &[u8]) -> io::Result<()> {
            if self.appends_left == 0 {
                return Err(io::Error::other("disk full"));
            }
            self.appends_left -= 1;
            Ok(())
        }

        fn finalize(&mut self) -> io::Result<RawCapture> {
            Err(io::Error::other("finalize should not be reached"))
        }

        fn discard(&mut self) {
            self.discarded.store(true, Ordering::SeqCst);
        }
    }

    fn stereo_44k() -> AudioFormat {
        AudioFormat::new(44100, 2).unwrap()
    }

    fn sink_in(dir: &Path) -> (FileRawSink, PathBuf) {
        let raw = dir.join("scratch").join("capture.raw");
        (FileRawSink::create(raw.clone()).unwrap(), raw)
    }

    #[test]
    fn records_for_target_duration() {
        let dir = tempfile::tempdir().unwrap();
        let delegate = Arc::new(RecordingDelegate::default());
        let mut session = CaptureSession::new(SyntheticSource::new());
        session.set_delegate(delegate.clone());

        let wav = dir.path().join("two_seconds.wav");
        let (sink, raw) = sink_in(dir.path());
        let request = SessionRequest::new(stereo_44k(), wav.clone()).with_duration(Some(Duration::from_secs(2)));

        let handle = session.start(request, sink).unwrap();
        assert!(handle.is_recording());
        let artifact = handle.wait().unwrap();

        let target = 44100 * 2 * 2 * 2;
        assert!(artifact.data_bytes >= target, "got {} bytes", artifact.data_bytes);
        assert!(artifact.data_bytes <= target + 4 * 8192, "got {} bytes", artifact.data_bytes);
        assert_eq!(artifact.data_bytes % 4, 0);
        assert_relative_eq!(artifact.duration_secs, artifact.data_bytes as f64 / 176_400.0);
        assert!(!artifact.diagnostics.drain_truncated);

        let file_len = std::fs::metadata(&wav).unwrap().len();
        assert_eq!(file_len, artifact.data_bytes + WAV_HEADER_SIZE as u64);
        assert_eq!(artifact.file_size(), file_len);
        assert!(!raw.exists());

        let reader = hound::WavReader::open(&wav).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(u64::from(reader.len()) * 2, artifact.data_bytes);

        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(
            *delegate.states.lock(),
            vec![
                CaptureState::Recording,
                CaptureState::Stopping,
                CaptureState::Finalizing,
                CaptureState::Idle
            ]
        );
        assert_eq!(delegate.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drains_every_captured_frame() {
        let dir = tempfile::tempdir().unwrap();
        let source = SyntheticSource::new();
        let probe = source.captured_frames();
        let session = CaptureSession::new(source);

        let (sink, _) = sink_in(dir.path());
        let handle = session
            .start(SessionRequest::new(stereo_44k(), dir.path().join("drain.wav")), sink)
            .unwrap();

        thread::sleep(Duration::from_millis(300));
        handle.request_stop();
        let artifact = handle.wait().unwrap();

        let captured = probe.load(Ordering::SeqCst);
        assert!(captured > 0);
        assert_eq!(artifact.data_bytes, captured * 4);
        assert_eq!(artifact.diagnostics.samples_read, captured * 2);
    }

    #[test]
    fn repeated_stop_requests_are_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());
        let (sink, _) = sink_in(dir.path());
        let handle = session
            .start(SessionRequest::new(stereo_44k(), dir.path().join("stop.wav")), sink)
            .unwrap();

        let token = handle.stop_token();
        handle.request_stop();
        token.cancel();
        handle.request_stop();

        let artifact = handle.wait().unwrap();
        assert!(artifact.exists());
        token.cancel();
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn second_start_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());

        let (sink, _) = sink_in(dir.path());
        let handle = session
            .start(SessionRequest::new(stereo_44k(), dir.path().join("first.wav")), sink)
            .unwrap();

        let second_raw = dir.path().join("second.raw");
        let second_sink = FileRawSink::create(second_raw.clone()).unwrap();
        let result = session.start(SessionRequest::new(stereo_44k(), dir.path().join("second.wav")), second_sink);
        assert!(matches!(result, Err(CaptureError::SessionActive)));
        assert!(!second_raw.exists());

        handle.request_stop();
        handle.wait().unwrap();
        assert!(!dir.path().join("second.wav").exists());
    }

    #[test]
    fn open_failure_returns_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new().unavailable());
        let (sink, raw) = sink_in(dir.path());

        let result = session.start(SessionRequest::new(stereo_44k(), dir.path().join("x.wav")), sink);
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(!raw.exists());
    }

    #[test]
    fn slow_device_respects_open_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new().with_ready_delay(Duration::from_secs(30)));
        let (sink, _) = sink_in(dir.path());

        let mut request = SessionRequest::new(stereo_44k(), dir.path().join("x.wav"));
        request.open_timeout = Duration::from_millis(100);

        let started = Instant::now();
        let result = session.start(request, sink);
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!session.is_recording());
    }

    #[test]
    fn read_error_aborts_session() {
        let dir = tempfile::tempdir().unwrap();
        let delegate = Arc::new(RecordingDelegate::default());
        let mut session = CaptureSession::new(SyntheticSource::new().failing_after(4096));
        session.set_delegate(delegate.clone());

        let wav = dir.path().join("broken.wav");
        let (sink, raw) = sink_in(dir.path());
        let handle = session.start(SessionRequest::new(stereo_44k(), wav.clone()), sink).unwrap();

        let result = handle.wait();
        assert!(matches!(result, Err(CaptureError::ReadError(_))));
        assert!(!wav.exists());
        assert!(!raw.exists());
        assert_eq!(session.state(), CaptureState::Idle);
        assert_eq!(delegate.errors.lock().len(), 1);
        assert_eq!(delegate.finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn sink_failure_is_capture_failed() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());
        let discarded = Arc::new(AtomicBool::new(false));
        let sink = FailingSink {
            appends_left: 2,
            discarded: Arc::clone(&discarded),
        };

        let wav = dir.path().join("full.wav");
        let handle = session.start(SessionRequest::new(stereo_44k(), wav.clone()), sink).unwrap();
        let result = handle.wait();

        assert!(matches!(result, Err(CaptureError::CaptureFailed(_))));
        assert!(discarded.load(Ordering::SeqCst));
        assert!(!wav.exists());
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn drain_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(ScriptedSource { endless: true });
        let (sink, _) = sink_in(dir.path());

        let mut request = SessionRequest::new(stereo_44k(), dir.path().join("endless.wav"));
        request.chunk_samples = 64;
        request.max_drain = Duration::from_millis(50);

        let handle = session.start(request, sink).unwrap();
        thread::sleep(Duration::from_millis(20));
        handle.request_stop();

        let started = Instant::now();
        let artifact = handle.wait().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(artifact.diagnostics.drain_truncated);
        assert!(artifact.diagnostics.drain_chunks > 0);
    }

    #[test]
    fn empty_capture_encodes_bare_header() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(ScriptedSource { endless: false });
        let (sink, _) = sink_in(dir.path());

        let wav = dir.path().join("empty.wav");
        let handle = session.start(SessionRequest::new(stereo_44k(), wav.clone()), sink).unwrap();
        handle.request_stop();
        let artifact = handle.wait().unwrap();

        assert_eq!(artifact.data_bytes, 0);
        assert_relative_eq!(artifact.duration_secs, 0.0);
        assert_eq!(std::fs::metadata(&wav).unwrap().len(), WAV_HEADER_SIZE as u64);
        assert_eq!(hound::WavReader::open(&wav).unwrap().len(), 0);
    }

    #[test]
    fn encode_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());
        let (sink, raw) = sink_in(dir.path());

        let wav = dir.path().join("missing-dir").join("out.wav");
        let mut handle = session.start(SessionRequest::new(stereo_44k(), wav.clone()), sink).unwrap();
        handle.request_stop();

        let result = handle.wait_timeout(WAIT).unwrap();
        assert!(matches!(
            result,
            Err(CaptureError::Encode(EncodeError::DestinationUnavailable(_)))
        ));
        assert!(handle.try_wait().is_none());
        assert!(!raw.exists());
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[test]
    fn writes_metadata_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());
        let (sink, _) = sink_in(dir.path());

        let mut request = SessionRequest::new(AudioFormat::new(16000, 1).unwrap(), dir.path().join("meta.wav"));
        request.write_metadata = true;

        let handle = session.start(request, sink).unwrap();
        thread::sleep(Duration::from_millis(100));
        handle.request_stop();
        let artifact = handle.wait().unwrap();

        let stored = metadata::read_metadata(&artifact.file_path).unwrap();
        assert_eq!(stored.sample_rate, 16000);
        assert_eq!(stored.channels, 1);
        assert_eq!(stored.data_bytes, artifact.data_bytes);
        assert_eq!(stored.checksum, artifact.checksum);
    }

    #[test]
    fn dropping_handle_stops_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = CaptureSession::new(SyntheticSource::new());
        let (sink, _) = sink_in(dir.path());

        let wav = dir.path().join("dropped.wav");
        let handle = session.start(SessionRequest::new(stereo_44k(), wav.clone()), sink).unwrap();
        drop(handle);

        assert_eq!(session.state(), CaptureState::Idle);
        assert!(wav.exists());
    }

    #[test]
    fn request_from_config() {
        let config = CaptureConfiguration {
            sample_rate: 48000,
            channels: 1,
            duration_secs: 3,
            read_chunk_samples: 1000,
            ..Default::default()
        };
        let request = SessionRequest::from_config(&config, PathBuf::from("out.wav")).unwrap();
        assert_eq!(request.format.sample_rate(), 48000);
        assert_eq!(request.duration, Some(Duration::from_secs(3)));
        assert_eq!(request.chunk_samples, 1000);
        assert!(request.write_metadata);

        let odd = SessionRequest {
            chunk_samples: 7,
            ..SessionRequest::new(stereo_44k(), PathBuf::from("x.wav"))
        };
        assert_eq!(odd.frame_aligned_chunk(), 6);
    }
}
