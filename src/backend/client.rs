use super::messages::{
    ChatRequest, ChatResponse, EndSessionRequest, StartSessionRequest, StartSessionResponse,
    TranscribeRequest, TranscribeResponse,
};
use crate::audio::AudioChunk;
use crate::error::ConsoleError;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP client for the vehicle command backend.
///
/// Every call is stateless and independent; session identity travels in the
/// request bodies. A hung backend resolves through the configured timeout
/// rather than wedging the console.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ConsoleError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a new conversation session and return its id.
    pub async fn start_session(&self) -> Result<String, ConsoleError> {
        let response = self
            .http
            .post(self.url("/session/start"))
            .json(&StartSessionRequest {})
            .send()
            .await?;
        let body: StartSessionResponse = check_status(response).await?.json().await?;
        info!(session_id = %body.session_id, "session started");
        Ok(body.session_id)
    }

    /// Notify the backend that a session is over. Best-effort; callers fire
    /// this from a detached task and never block on it.
    pub async fn end_session(&self, session_id: &str) -> Result<(), ConsoleError> {
        let response = self
            .http
            .post(self.url("/session/end"))
            .json(&EndSessionRequest {
                session_id: session_id.to_string(),
            })
            .send()
            .await?;
        check_status(response).await?;
        debug!(session_id, "session end delivered");
        Ok(())
    }

    /// Dispatch one command and return the backend reply.
    pub async fn chat(&self, message: &str, session_id: &str) -> Result<ChatResponse, ConsoleError> {
        let response = self
            .http
            .post(self.url("/chat"))
            .json(&ChatRequest {
                message: message.to_string(),
                session_id: session_id.to_string(),
            })
            .send()
            .await?;
        let body: ChatResponse = check_status(response).await?.json().await?;
        Ok(body)
    }

    /// Submit coalesced audio chunks for transcription.
    ///
    /// The caller is responsible for batching; one call per flush tick or
    /// final remainder, never more often.
    pub async fn transcribe(
        &self,
        chunks: &[AudioChunk],
        session_id: Option<&str>,
        final_chunk: bool,
    ) -> Result<String, ConsoleError> {
        let Some(first) = chunks.first() else {
            return Ok(String::new());
        };

        let pcm: Vec<u8> = chunks
            .iter()
            .flat_map(|chunk| chunk.samples.iter().copied())
            .flat_map(i16::to_le_bytes)
            .collect();

        let request = TranscribeRequest {
            session_id: session_id.map(str::to_string),
            pcm: base64::engine::general_purpose::STANDARD.encode(&pcm),
            sample_rate: first.sample_rate,
            channels: first.channels,
            sequence: first.sequence,
            final_chunk,
        };

        let response = self
            .http
            .post(self.url("/transcribe"))
            .json(&request)
            .send()
            .await?;
        let body: TranscribeResponse = check_status(response).await?.json().await?;
        debug!(
            bytes = pcm.len(),
            final_chunk,
            text = %body.transcription,
            "transcription received"
        );
        Ok(body.transcription)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ConsoleError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ConsoleError::Backend { status, body })
}
