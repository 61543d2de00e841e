//! Voice session lifecycle
//!
//! This module provides the `VoiceSession` controller that coordinates:
//! - Microphone capture and per-frame activity metering
//! - The live transport (frames out, events in)
//! - Gapless playback scheduling with interruption handling
//! - Transcript assembly into the conversation log
//! - Idempotent teardown of every acquired resource

mod config;
mod manager;
mod session;
mod stats;

pub use config::{SessionConfig, UsageCounts};
pub use manager::SessionManager;
pub use session::VoiceSession;
pub use stats::SessionStats;
