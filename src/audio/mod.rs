pub mod archive;
pub mod capture;
pub mod mic;
pub mod scripted;

pub use archive::RecordingArchive;
pub use capture::{AudioCapture, AudioChunk, CaptureConfig, CaptureSource, CaptureSourceFactory};
pub use mic::MicCapture;
pub use scripted::ScriptedCapture;
