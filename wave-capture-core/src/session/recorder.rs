use std::sync::Arc;
use std::time::Duration;

use super::cancel::CancelToken;
use super::capture::{CaptureSession, SessionHandle, SessionRequest};
use crate::models::audio_models::AudioSource;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::Artifact;
use crate::models::state::CaptureState;
use crate::storage::erase::erase_recording;
use crate::storage::paths::{ensure_dir, CapturePaths};
use crate::storage::raw_sink::FileRawSink;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::media_indexer::MediaIndexer;
use crate::traits::player::Player;
use crate::traits::sample_source::SampleSource;

/// Caller-facing recorder: one source, one configuration, and the most
/// recent finished recording.
///
/// Owns the session handle and the cached artifact explicitly; nothing is
/// shared through globals. Starting a new recording clears the cached
/// artifact, and a failed recording leaves none behind.
pub struct Recorder<S: SampleSource> {
    session: CaptureSession<S>,
    config: CaptureConfiguration,
    active: Option<SessionHandle>,
    artifact: Option<Artifact>,
}

impl<S: SampleSource> Recorder<S> {
    pub fn new(source: S, config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        Ok(Self {
            session: CaptureSession::new(source),
            config,
            active: None,
            artifact: None,
        })
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn CaptureDelegate>) -> Self {
        self.session.set_delegate(delegate);
        self
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn MediaIndexer>) -> Self {
        self.session.set_indexer(indexer);
        self
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    /// Input devices this recorder can capture from.
    pub fn available_sources(&self) -> Vec<AudioSource> {
        let source = self.session.source();
        if source.is_available() {
            vec![source.device_info()]
        } else {
            Vec::new()
        }
    }

    /// Start recording with the current configuration.
    ///
    /// A previous recording that finished without its outcome being
    /// collected (through `wait` or `try_completion`) is settled here and
    /// logged; its WAVE file stays on disk and the delegate has already been
    /// told about it. The cached artifact is cleared either way.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if let Some(handle) = self.active.take() {
            if self.session.state().is_active() {
                self.active = Some(handle);
                return Err(CaptureError::SessionActive);
            }
            // The worker is idle; at most its final report is still in flight.
            match handle.wait() {
                Ok(previous) => log::info!(
                    "Previous recording {} finished uncollected",
                    previous.file_path.display()
                ),
                Err(e) => log::warn!("Previous recording failed uncollected: {}", e),
            }
        }
        self.artifact = None;

        let config = &self.config;
        ensure_dir(&config.output_directory)?;
        ensure_dir(&config.scratch_directory)?;

        let paths = CapturePaths::now(&config.scratch_directory, &config.output_directory);
        let request = SessionRequest::from_config(config, paths.wav)?;
        let sink = FileRawSink::create(paths.raw)?;

        let handle = self.session.start(request, sink)?;
        self.active = Some(handle);
        Ok(())
    }

    /// Replace the configuration, then start.
    pub fn start_with(&mut self, config: CaptureConfiguration) -> Result<(), CaptureError> {
        if self.session.state().is_active() {
            return Err(CaptureError::SessionActive);
        }
        config.validate().map_err(CaptureError::InvalidConfiguration)?;
        self.config = config;
        self.start()
    }

    /// Request an orderly stop of the active recording. Idempotent; a no-op
    /// when nothing is recording.
    pub fn request_stop(&self) {
        if let Some(ref handle) = self.active {
            handle.request_stop();
        }
    }

    /// Stop signal of the active recording, usable from other threads.
    pub fn stop_token(&self) -> Option<CancelToken> {
        self.active.as_ref().map(SessionHandle::stop_token)
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    /// Outcome of the active recording, if it has finished.
    pub fn try_completion(&mut self) -> Option<Result<Artifact, CaptureError>> {
        let outcome = self.active.as_mut()?.try_wait()?;
        Some(self.settle(outcome))
    }

    /// Wait up to `timeout` for the active recording to finish.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> Option<Result<Artifact, CaptureError>> {
        let outcome = self.active.as_mut()?.wait_timeout(timeout)?;
        Some(self.settle(outcome))
    }

    /// Block until the active recording finishes.
    ///
    /// Without an active recording this returns the cached artifact, or
    /// [`CaptureError::NoArtifact`].
    pub fn wait(&mut self) -> Result<Artifact, CaptureError> {
        match self.active.take() {
            Some(handle) => {
                let outcome = handle.wait();
                self.settle(outcome)
            }
            None => self.artifact.clone().ok_or(CaptureError::NoArtifact),
        }
    }

    fn settle(&mut self, outcome: Result<Artifact, CaptureError>) -> Result<Artifact, CaptureError> {
        self.active = None;
        match outcome {
            Ok(artifact) => {
                self.artifact = Some(artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                self.artifact = None;
                Err(e)
            }
        }
    }

    /// The most recent finished recording.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Delete the cached recording and forget it.
    pub fn erase(&mut self) -> Result<(), CaptureError> {
        let artifact = self.artifact.take().ok_or(CaptureError::NoArtifact)?;
        erase_recording(&artifact.file_path)
    }

    /// Play the cached recording.
    pub fn play(&self, player: &dyn Player) -> Result<(), CaptureError> {
        match self.artifact {
            Some(ref artifact) if artifact.exists() => player.play(&artifact.file_path),
            _ => Err(CaptureError::NoArtifact),
        }
    }
}
