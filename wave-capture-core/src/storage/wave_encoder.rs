use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::EncodeError;
use crate::processing::wav_format::WaveHeader;

/// Bytes copied per read when streaming the raw payload.
pub const COPY_CHUNK_SIZE: usize = 8192;

/// Outcome of streaming a header and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSummary {
    pub data_bytes: u64,
    /// SHA-256 of header + payload, lowercase hex.
    pub checksum: String,
}

/// A WAVE file written by [`WaveEncoder::encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedWave {
    pub path: PathBuf,
    pub data_bytes: u64,
    pub checksum: String,
}

/// Transcodes a finished raw PCM capture into a RIFF/WAVE file.
///
/// ```text
/// [raw file] ──len──→ [44-byte header] ──┐
///      └──────── bounded chunk copy ─────┴→ [destination.wav]
/// ```
///
/// The payload is never held in memory as a whole, so captures of any
/// length (up to the 4 GiB RIFF limit) encode in constant space.
#[derive(Debug, Clone)]
pub struct WaveEncoder {
    chunk_size: usize,
}

impl Default for WaveEncoder {
    fn default() -> Self {
        Self {
            chunk_size: COPY_CHUNK_SIZE,
        }
    }
}

impl WaveEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Encode the raw file at `raw_path` into `destination`.
    ///
    /// The payload length is taken from the raw file's size before copying
    /// starts. On failure the partially written destination is removed.
    pub fn encode(&self, raw_path: &Path, format: &AudioFormat, destination: &Path) -> Result<EncodedWave, EncodeError> {
        let raw = File::open(raw_path)
            .map_err(|e| EncodeError::SourceUnavailable(format!("{}: {}", raw_path.display(), e)))?;
        let raw_len = raw
            .metadata()
            .map_err(|e| EncodeError::SourceUnavailable(format!("{}: {}", raw_path.display(), e)))?
            .len();

        // Reject before touching the destination.
        WaveHeader::for_payload(raw_len, format)?;

        let file = File::create(destination)
            .map_err(|e| EncodeError::DestinationUnavailable(format!("{}: {}", destination.display(), e)))?;

        match self.encode_stream(raw, raw_len, format, BufWriter::new(file)) {
            Ok(summary) => {
                log::info!(
                    "Encoded {} bytes of PCM into {}",
                    summary.data_bytes,
                    destination.display()
                );
                Ok(EncodedWave {
                    path: destination.to_path_buf(),
                    data_bytes: summary.data_bytes,
                    checksum: summary.checksum,
                })
            }
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(destination) {
                    log::warn!(
                        "Failed to remove partial output {}: {}",
                        destination.display(),
                        remove_err
                    );
                }
                Err(e)
            }
        }
    }

    /// Write the header for `raw_len` bytes, then copy exactly `raw_len`
    /// bytes from `raw` to `out` in bounded chunks.
    pub fn encode_stream<R: Read, W: Write>(
        &self,
        raw: R,
        raw_len: u64,
        format: &AudioFormat,
        mut out: W,
    ) -> Result<EncodeSummary, EncodeError> {
        let header = WaveHeader::for_payload(raw_len, format)?.to_bytes();
        let mut hasher = Sha256::new();

        out.write_all(&header).map_err(destination_error)?;
        hasher.update(header);

        let mut input = raw.take(raw_len);
        let mut buf = vec![0u8; self.chunk_size];
        let mut copied: u64 = 0;

        while copied < raw_len {
            let read = match input.read(&mut buf) {
                Ok(0) => {
                    return Err(EncodeError::SourceTruncated {
                        expected: raw_len,
                        copied,
                    })
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("Raw source read failed after {} bytes: {}", copied, e);
                    return Err(EncodeError::SourceTruncated {
                        expected: raw_len,
                        copied,
                    });
                }
            };
            out.write_all(&buf[..read]).map_err(destination_error)?;
            hasher.update(&buf[..read]);
            copied += read as u64;
        }

        out.flush().map_err(destination_error)?;

        Ok(EncodeSummary {
            data_bytes: copied,
            checksum: hex_encode(&hasher.finalize()),
        })
    }
}

fn destination_error(e: io::Error) -> EncodeError {
    EncodeError::DestinationUnavailable(format!("write failed: {}", e))
}

/// Lowercase hex encoding of a digest.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
