use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::models::error::CaptureError;

/// Scratch and destination paths for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePaths {
    pub raw: PathBuf,
    pub wav: PathBuf,
}

impl CapturePaths {
    /// Build timestamped names for a capture started at `started_at`.
    ///
    /// A short random suffix keeps two captures within the same second apart.
    pub fn new(scratch_directory: &Path, output_directory: &Path, started_at: DateTime<Utc>) -> Self {
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let id = uuid::Uuid::new_v4().simple().to_string();
        let suffix = &id[..8];
        Self {
            raw: scratch_directory.join(format!("capture_{}_{}.raw", stamp, suffix)),
            wav: output_directory.join(format!("recording_{}_{}.wav", stamp, suffix)),
        }
    }

    pub fn now(scratch_directory: &Path, output_directory: &Path) -> Self {
        Self::new(scratch_directory, output_directory, Utc::now())
    }
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), CaptureError> {
    fs::create_dir_all(dir)
        .map_err(|e| CaptureError::StorageError(format!("failed to create directory {}: {}", dir.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn names_carry_timestamp_and_extension() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let paths = CapturePaths::new(Path::new("/scratch"), Path::new("/music"), at);

        assert_eq!(paths.raw.parent(), Some(Path::new("/scratch")));
        assert_eq!(paths.wav.parent(), Some(Path::new("/music")));

        let raw_name = paths.raw.file_name().unwrap().to_string_lossy().to_string();
        let wav_name = paths.wav.file_name().unwrap().to_string_lossy().to_string();
        assert!(raw_name.starts_with("capture_20260314_150926_"));
        assert!(raw_name.ends_with(".raw"));
        assert!(wav_name.starts_with("recording_20260314_150926_"));
        assert!(wav_name.ends_with(".wav"));
    }

    #[test]
    fn same_second_captures_differ() {
        let at = Utc.with_ymd_and_hms(2026, 3, 14, 15, 9, 26).unwrap();
        let a = CapturePaths::new(Path::new("."), Path::new("."), at);
        let b = CapturePaths::new(Path::new("."), Path::new("."), at);
        assert_ne!(a.wav, b.wav);
        assert_ne!(a.raw, b.raw);
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Existing directories are fine.
        ensure_dir(&nested).unwrap();
    }
}
