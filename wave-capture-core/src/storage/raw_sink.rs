use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;

/// A raw PCM capture after its sink has been flushed and closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCapture {
    pub path: PathBuf,
    pub byte_len: u64,
}

/// Append-only byte sink that accumulates raw PCM during a session.
///
/// Owned exclusively by the capture worker until `finalize`; after that the
/// raw file belongs to the encoder step and is deleted once the WAVE file
/// exists.
pub trait RawSink: Send {
    /// Append bytes in capture order.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush and close the sink, returning where the raw bytes live.
    fn finalize(&mut self) -> io::Result<RawCapture>;

    /// Close the sink and delete whatever it stored.
    ///
    /// Sinks backed by storage also do this when dropped unfinalized.
    fn discard(&mut self);
}

/// Buffered raw PCM file in the scratch directory.
///
/// ## File Format
///
/// ```text
/// [raw little-endian interleaved 16-bit PCM...]
/// ```
///
/// No header; the length is only known once the sink is finalized.
/// Dropping an unfinalized sink deletes the file.
pub struct FileRawSink {
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
    bytes_written: u64,
}

impl FileRawSink {
    /// Create (or truncate) the raw file, creating its directory if needed.
    pub fn create(file_path: PathBuf) -> Result<Self, CaptureError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CaptureError::CaptureFailed(format!("failed to create scratch directory: {}", e)))?;
        }

        let file = File::create(&file_path)
            .map_err(|e| CaptureError::CaptureFailed(format!("failed to create raw capture file: {}", e)))?;

        log::debug!("Raw capture file created: {}", file_path.display());
        Ok(Self {
            file_path,
            writer: Some(BufWriter::new(file)),
            bytes_written: 0,
        })
    }

    /// Total bytes appended so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the raw file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl RawSink for FileRawSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("raw sink is closed"))?;
        writer.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> io::Result<RawCapture> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::other("raw sink is closed"))?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        log::debug!(
            "Raw capture finalized: {} bytes in {}",
            self.bytes_written,
            self.file_path.display()
        );
        Ok(RawCapture {
            path: self.file_path.clone(),
            byte_len: self.bytes_written,
        })
    }

    fn discard(&mut self) {
        self.writer = None;
        match fs::remove_file(&self.file_path) {
            Ok(()) => log::debug!("Discarded raw capture {}", self.file_path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete raw capture {}: {}", self.file_path.display(), e),
        }
    }
}

impl Drop for FileRawSink {
    /// A sink dropped before `finalize` never produced a capture; its
    /// partial file is deleted.
    fn drop(&mut self) {
        if self.writer.is_some() {
            self.discard();
        }
    }
}
