//! Capture scheduling
//!
//! The scheduler owns the recording state machine and the flush cycle that
//! turns buffered audio into interim drafts and exactly one final command.

mod scheduler;

pub use scheduler::{CaptureScheduler, CaptureState, SchedulerConfig};
