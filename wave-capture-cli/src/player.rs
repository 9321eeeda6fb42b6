use std::path::Path;
use std::process::{Command, Stdio};

use wave_capture_core::{CaptureError, Player};

/// Plays a file by handing it to the platform's command-line player.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `afplay` on macOS, `aplay` elsewhere.
    pub fn system() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("afplay", Vec::new())
        } else {
            Self::new("aplay", vec!["-q".into()])
        }
    }
}

impl Player for CommandPlayer {
    fn play(&self, path: &Path) -> Result<(), CaptureError> {
        log::info!("Playing {} with {}", path.display(), self.program);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| CaptureError::Playback(format!("failed to run {}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(CaptureError::Playback(format!("{} exited with {}", self.program, status)))
        }
    }
}
