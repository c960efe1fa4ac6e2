//! Conversation session management
//!
//! Owns session identity and the start/end protocol with the command
//! backend: one-shot start, idempotent best-effort end, and adoption of
//! backend-signalled session-id rotations.

mod manager;

pub use manager::{Session, SessionManager, SessionState};
