use super::log::{Message, MessageLog};
use super::{ConnectionStatus, LinkStatus};
use crate::backend::BackendClient;
use crate::session::SessionManager;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Text of the error-flagged reply appended when a dispatch cannot reach the
/// backend.
pub const CONNECTION_ERROR_TEXT: &str =
    "Connection error. Check the vehicle link and try again.";

/// Turns a finalized command string (typed or transcribed) into a backend
/// chat call and records the exchange in the message log.
pub struct CommandDispatcher {
    client: Arc<BackendClient>,
    session: Arc<SessionManager>,
    log: Arc<MessageLog>,
    link: Arc<LinkStatus>,
    awaiting_reply: AtomicBool,
}

impl CommandDispatcher {
    pub fn new(
        client: Arc<BackendClient>,
        session: Arc<SessionManager>,
        log: Arc<MessageLog>,
        link: Arc<LinkStatus>,
    ) -> Self {
        Self {
            client,
            session,
            log,
            link,
            awaiting_reply: AtomicBool::new(false),
        }
    }

    /// Whether a dispatched command is still waiting for its reply. Drives
    /// the loading indicator and disables the input affordances.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply.load(Ordering::SeqCst)
    }

    /// Dispatch one command.
    ///
    /// Returns `None` when a precondition fails (blank text or no active
    /// session); neither case touches the network or the log. Otherwise the
    /// user message is appended optimistically before the call, and exactly
    /// one bot entry (reply or error-flagged) is appended after it.
    pub async fn dispatch(&self, text: &str) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let session_id = match self.session.require_session().await {
            Ok(id) => id,
            // Silent no-op guard: the affordance is disabled in the display,
            // so a missing session is not a reported error.
            Err(_) => {
                debug!("dropping command, no active session");
                return None;
            }
        };

        self.log.push_user(text).await;
        self.awaiting_reply.store(true, Ordering::SeqCst);

        let outcome = self.client.chat(text, &session_id).await;
        let reply = match outcome {
            Ok(reply) => {
                if let Some(rotated) = reply.session_id {
                    if rotated != session_id {
                        self.session.adopt(rotated).await;
                    }
                }
                self.link.set(ConnectionStatus::Connected);
                self.log.push_bot(&reply.response).await
            }
            Err(e) => {
                warn!("command dispatch failed: {e}");
                self.link.set(ConnectionStatus::Disconnected);
                self.log.push_error(CONNECTION_ERROR_TEXT).await
            }
        };

        self.awaiting_reply.store(false, Ordering::SeqCst);
        Some(reply)
    }
}
