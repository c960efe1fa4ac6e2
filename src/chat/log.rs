use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Who authored a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One chat entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique, monotonically increasing within the log.
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

/// In-memory chat history for the conversation display.
///
/// Cleared only by an explicit [`clear`](Self::clear); clearing never touches
/// the session.
pub struct MessageLog {
    next_id: AtomicU64,
    entries: Mutex<Vec<Message>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub async fn push_user(&self, text: &str) -> Message {
        self.push(Role::User, text, false).await
    }

    pub async fn push_bot(&self, text: &str) -> Message {
        self.push(Role::Bot, text, false).await
    }

    /// Append an error-flagged bot entry.
    pub async fn push_error(&self, text: &str) -> Message {
        self.push(Role::Bot, text, true).await
    }

    async fn push(&self, role: Role, text: &str, is_error: bool) -> Message {
        let message = Message {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            role,
            text: text.to_string(),
            timestamp: Utc::now(),
            is_error,
        };
        self.entries.lock().await.push(message.clone());
        message
    }

    pub async fn snapshot(&self) -> Vec<Message> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop the history. Ids keep increasing across clears.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
