use std::path::Path;

use crate::models::error::CaptureError;

/// Post-encode hook that registers a new media file with an external index.
pub trait MediaIndexer: Send + Sync {
    fn index(&self, path: &Path) -> Result<(), CaptureError>;
}

/// Indexer that only records the new file in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndexer;

impl MediaIndexer for LogIndexer {
    fn index(&self, path: &Path) -> Result<(), CaptureError> {
        log::info!("New recording available: {}", path.display());
        Ok(())
    }
}
