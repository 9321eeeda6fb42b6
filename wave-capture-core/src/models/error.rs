use thiserror::Error;

/// Errors produced while turning a raw PCM capture into a WAVE container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("destination unavailable: {0}")]
    DestinationUnavailable(String),

    #[error("raw source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("raw source truncated: expected {expected} bytes, copied {copied}")]
    SourceTruncated { expected: u64, copied: u64 },

    #[error("payload of {0} bytes exceeds the RIFF size limit")]
    PayloadTooLarge(u64),

    #[error("malformed wave header: {0}")]
    MalformedHeader(String),
}

/// Errors that can occur during capture, encoding, or artifact handling.
///
/// Every I/O failure is translated into one of these variants at the
/// component boundary, so callers never see a bare `std::io::Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("device read failed: {0}")]
    ReadError(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("configuration failed: {0}")]
    InvalidConfiguration(String),

    #[error("a capture session is already active")]
    SessionActive,

    #[error("no recording available")]
    NoArtifact,

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
