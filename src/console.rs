use crate::audio::AudioCapture;
use crate::backend::BackendClient;
use crate::capture::{CaptureScheduler, CaptureState, SchedulerConfig};
use crate::chat::{CommandDispatcher, ConnectionStatus, LinkStatus, Message, MessageLog};
use crate::error::ConsoleError;
use crate::session::{SessionManager, SessionState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Seeded into the chat when the console comes up.
pub const GREETING: &str = "Hello! I'm your vehicle control assistant. Drive it with \
natural language like \"move forward\", \"turn left\", or \"stop\".";

/// Single-owner controller wiring the session, capture and chat components
/// together. The conversation display drives this and nothing else.
pub struct VoiceConsole {
    session: Arc<SessionManager>,
    scheduler: CaptureScheduler,
    dispatcher: CommandDispatcher,
    log: Arc<MessageLog>,
    link: Arc<LinkStatus>,
    greeted: AtomicBool,
}

impl VoiceConsole {
    pub fn new(
        client: Arc<BackendClient>,
        source: Box<dyn AudioCapture>,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let session = Arc::new(SessionManager::new(Arc::clone(&client)));
        let log = Arc::new(MessageLog::new());
        let link = Arc::new(LinkStatus::new());

        let scheduler = CaptureScheduler::new(
            source,
            Arc::clone(&client),
            Arc::clone(&session),
            scheduler_config,
        );
        let dispatcher = CommandDispatcher::new(
            client,
            Arc::clone(&session),
            Arc::clone(&log),
            Arc::clone(&link),
        );

        Self {
            session,
            scheduler,
            dispatcher,
            log,
            link,
            greeted: AtomicBool::new(false),
        }
    }

    /// Seed the greeting and establish the backend session. Safe to call
    /// repeatedly; only the first call reaches the network.
    pub async fn connect(&self) -> Result<(), ConsoleError> {
        if !self.greeted.swap(true, Ordering::SeqCst) {
            self.log.push_bot(GREETING).await;
        }
        self.session.start().await.map(|_| ())
    }

    /// Send a typed or quick-button command.
    pub async fn send(&self, text: &str) -> Option<Message> {
        self.dispatcher.dispatch(text).await
    }

    /// Begin voice capture. Rejected while the session is absent: everything
    /// a recording leads to is session-gated.
    pub async fn start_voice(&self) -> Result<(), ConsoleError> {
        self.session.require_session().await?;
        self.scheduler.start_recording().await
    }

    /// Stop voice capture and dispatch the final transcript.
    ///
    /// This is the only path that turns a transcription into a command:
    /// exactly one dispatch per final result, none for interim drafts.
    pub async fn stop_voice(&self) -> Result<Option<Message>, ConsoleError> {
        match self.scheduler.stop_recording().await? {
            Some(text) => Ok(self.dispatcher.dispatch(&text).await),
            None => Ok(None),
        }
    }

    /// Live draft from interim transcriptions.
    pub fn draft(&self) -> watch::Receiver<Option<String>> {
        self.scheduler.draft()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.log.snapshot().await
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.link.status()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.scheduler.state()
    }

    /// Whether a dispatched command is still awaiting its reply.
    pub fn is_awaiting_reply(&self) -> bool {
        self.dispatcher.is_awaiting_reply()
    }

    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// Clear the chat history. The session is untouched.
    pub async fn reset(&self) {
        self.log.clear().await;
    }

    /// End the session, best-effort and idempotent. Called from every
    /// shutdown signal; duplicates are no-ops.
    pub async fn shutdown(&self) {
        self.session.end().await;
    }
}
