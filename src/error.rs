use thiserror::Error;

/// Failures surfaced by the console core.
///
/// Permission and device errors abort a capture attempt without touching
/// session state. Transport and backend errors during dispatch or a final
/// transcription become an error-flagged chat message plus a Disconnected
/// link. Nothing here is retried automatically; retry is a user re-attempt.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("no usable audio input device: {0}")]
    DeviceUnavailable(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned status {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("no active session")]
    SessionNotActive,

    #[error("a recording is already in progress")]
    RecordingBusy,
}

impl ConsoleError {
    /// True for errors a capture attempt should surface as an operator alert.
    pub fn is_capture_denial(&self) -> bool {
        matches!(
            self,
            ConsoleError::PermissionDenied(_) | ConsoleError::DeviceUnavailable(_)
        )
    }
}
