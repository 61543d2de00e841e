use crate::live::TransportState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Connection state of the live transport
    pub state: TransportState,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of capture frames submitted so far
    pub frames_sent: usize,

    /// Number of messages in the conversation log
    pub message_count: usize,

    /// Most recent microphone activity level (RMS, 0.0 = silence)
    pub activity_level: f32,
}
