pub mod client;
pub mod messages;

pub use client::BackendClient;
pub use messages::{
    ChatRequest, ChatResponse, EndSessionRequest, StartSessionRequest, StartSessionResponse,
    TranscribeRequest, TranscribeResponse,
};
