//! Chat surface of the console: message history, the command dispatcher and
//! the process-wide connection flag read by the display.

pub mod commands;
mod dispatcher;
mod log;

pub use commands::{with_speed, MAX_SPEED, QUICK_COMMANDS};
pub use dispatcher::{CommandDispatcher, CONNECTION_ERROR_TEXT};
pub use log::{Message, MessageLog, Role};

use std::sync::atomic::{AtomicBool, Ordering};

/// Transport health as last observed by the dispatcher or session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// Process-wide connection flag. Starts Connected; flips on transport
/// failure and back on the next successful dispatch.
#[derive(Debug, Default)]
pub struct LinkStatus {
    disconnected: AtomicBool,
}

impl LinkStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ConnectionStatus {
        if self.disconnected.load(Ordering::Relaxed) {
            ConnectionStatus::Disconnected
        } else {
            ConnectionStatus::Connected
        }
    }

    pub fn set(&self, status: ConnectionStatus) {
        self.disconnected.store(
            matches!(status, ConnectionStatus::Disconnected),
            Ordering::Relaxed,
        );
    }
}
