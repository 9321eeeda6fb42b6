//! # wave-capture-core
//!
//! Device-agnostic capture pipeline: pull 16-bit PCM from an input source on
//! a worker thread, spool it to a raw scratch file, and transcode the result
//! into a RIFF/WAVE file once the session stops.
//!
//! Hardware backends (cpal) implement the `SampleSource` trait and plug into
//! the generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! wave-capture-core (this crate)
//! ├── traits/       ← SampleSource, InputStream, CaptureDelegate, MediaIndexer, Player
//! ├── models/       ← CaptureError, EncodeError, CaptureState, CaptureConfiguration, Artifact
//! ├── processing/   ← WAVE header codec, PCM byte conversion, SampleQueue
//! ├── session/      ← CaptureSession (worker + watchdog), Recorder facade
//! ├── sources/      ← SyntheticSource (wall-clock paced tone generator)
//! └── storage/      ← RawSink, WaveEncoder, metadata sidecar, naming, erase
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod sources;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFormat, AudioSource, CaptureSessionDiagnostics};
pub use models::config::CaptureConfiguration;
pub use models::error::{CaptureError, EncodeError};
pub use models::recording_result::{Artifact, RecordingMetadata};
pub use models::state::CaptureState;
pub use processing::sample_queue::SampleQueue;
pub use processing::wav_format::WaveHeader;
pub use session::cancel::CancelToken;
pub use session::capture::{CaptureSession, SessionHandle, SessionRequest};
pub use session::recorder::Recorder;
pub use sources::synthetic::SyntheticSource;
pub use storage::raw_sink::{FileRawSink, RawSink};
pub use storage::wave_encoder::WaveEncoder;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::media_indexer::{LogIndexer, MediaIndexer};
pub use traits::player::Player;
pub use traits::sample_source::{InputStream, SampleSource};
