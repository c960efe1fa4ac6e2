use crate::backend::BackendClient;
use crate::error::ConsoleError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Server-tracked conversation identity correlating a sequence of commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
}

/// Lifecycle of the conversation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Active(Session),
    Ended,
}

/// Owns the conversation session and its start/end protocol.
///
/// Exactly one Active session exists per manager; other components read the
/// id through [`session_id`](Self::session_id) and never mutate it.
pub struct SessionManager {
    client: Arc<BackendClient>,
    started: AtomicBool,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self {
            client,
            started: AtomicBool::new(false),
            state: Mutex::new(SessionState::Unstarted),
        }
    }

    /// Establish the session with the backend.
    ///
    /// The network call runs exactly once per manager lifetime; re-entrant
    /// callers get the current session back without a second call. A start
    /// failure leaves the state Unstarted and is never retried; the console
    /// runs degraded and every session-gated action is silently rejected.
    pub async fn start(&self) -> Result<Option<Session>, ConsoleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(self.current_session().await);
        }

        match self.client.start_session().await {
            Ok(id) => {
                let session = Session { id };
                *self.state.lock().await = SessionState::Active(session.clone());
                Ok(Some(session))
            }
            Err(e) => {
                // Silent by design: there is no session to chat against yet,
                // so no chat message is created for this failure.
                warn!("failed to start session: {e}");
                Err(e)
            }
        }
    }

    /// Best-effort teardown. Idempotent; the backend notification rides a
    /// detached task so shutdown never waits on it, even under duplicate
    /// shutdown signals.
    pub async fn end(&self) {
        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut *state, SessionState::Ended)
        };

        if let SessionState::Active(session) = previous {
            info!(session_id = %session.id, "ending session");
            let client = Arc::clone(&self.client);
            tokio::spawn(async move {
                if let Err(e) = client.end_session(&session.id).await {
                    debug!("session end notification failed: {e}");
                }
            });
        }
    }

    /// Id of the active session, if any. The gate for every dispatch and
    /// final transcription.
    pub async fn session_id(&self) -> Option<String> {
        match &*self.state.lock().await {
            SessionState::Active(session) => Some(session.id.clone()),
            _ => None,
        }
    }

    /// Active session id, or `SessionNotActive` for callers that gate on it.
    pub async fn require_session(&self) -> Result<String, ConsoleError> {
        self.session_id()
            .await
            .ok_or(ConsoleError::SessionNotActive)
    }

    /// Adopt a backend-signalled session-id rotation. Only meaningful while
    /// Active; ignored otherwise.
    pub async fn adopt(&self, new_id: String) {
        let mut state = self.state.lock().await;
        if let SessionState::Active(session) = &mut *state {
            if session.id != new_id {
                info!(from = %session.id, to = %new_id, "adopting rotated session id");
                session.id = new_id;
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    async fn current_session(&self) -> Option<Session> {
        match &*self.state.lock().await {
            SessionState::Active(session) => Some(session.clone()),
            _ => None,
        }
    }
}
