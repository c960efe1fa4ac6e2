pub mod audio;
pub mod backend;
pub mod capture;
pub mod chat;
pub mod config;
pub mod console;
pub mod error;
pub mod session;

pub use audio::{
    AudioCapture, AudioChunk, CaptureConfig, CaptureSource, CaptureSourceFactory, MicCapture,
    RecordingArchive, ScriptedCapture,
};
pub use backend::BackendClient;
pub use capture::{CaptureScheduler, CaptureState, SchedulerConfig};
pub use chat::{
    with_speed, CommandDispatcher, ConnectionStatus, LinkStatus, Message, MessageLog, Role,
    CONNECTION_ERROR_TEXT, MAX_SPEED, QUICK_COMMANDS,
};
pub use config::Config;
pub use console::{VoiceConsole, GREETING};
pub use error::ConsoleError;
pub use session::{Session, SessionManager, SessionState};
