use serde::{Deserialize, Serialize};

/// POST /session/start; body is intentionally empty.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
}

/// POST /session/end; best-effort, response body ignored.
#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: String,
}

/// POST /chat
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    /// The backend may rotate the session; a differing id must be adopted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// POST /transcribe
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Base64-encoded little-endian i16 PCM.
    pub pcm: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Sequence number of the first coalesced chunk.
    pub sequence: u64,
    #[serde(rename = "final")]
    pub final_chunk: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub transcription: String,
}
