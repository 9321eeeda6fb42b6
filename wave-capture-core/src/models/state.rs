/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → finalizing → idle
///            ↓           ↓           ↓
///           idle (on any failure)
/// ```
///
/// `Idle` is both the initial and the terminal state. Only one session may be
/// outside `Idle` at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
    Stopping,
    Finalizing,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    /// True while a session owns the device, the raw sink, or the encoder.
    pub fn is_active(&self) -> bool {
        !self.is_idle()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Finalizing => "finalizing",
        }
    }
}
