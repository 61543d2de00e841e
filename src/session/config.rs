use crate::tools::{StudyToolRouter, ToolDeclaration};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "voice-2026-08-26-evening")
    pub session_id: String,

    /// Model identifier for the live voice endpoint
    pub model: String,

    /// Voice/style selector for synthesized output
    pub voice_name: String,

    /// Base system instruction for the assistant
    pub system_instruction: String,

    /// Tool declarations advertised at session open
    #[serde(default)]
    pub tool_declarations: Vec<ToolDeclaration>,

    /// Capture sample rate (the live endpoint expects 16kHz)
    pub input_sample_rate: u32,

    /// Playback sample rate of synthesized audio (24kHz)
    pub output_sample_rate: u32,

    /// Samples per capture frame
    pub frame_samples: usize,

    /// Bound on connection establishment plus acknowledgment
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("voice-{}", uuid::Uuid::new_v4()),
            model: "models/gemini-2.0-flash-live-001".to_string(),
            voice_name: "Puck".to_string(),
            system_instruction:
                "You are Sage, a friendly study assistant. Keep spoken answers short."
                    .to_string(),
            tool_declarations: StudyToolRouter::declarations(),
            input_sample_rate: 16000,  // Live endpoint expects 16kHz capture
            output_sample_rate: 24000, // Synthesized audio arrives at 24kHz
            frame_samples: 4096,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Counts of prior study artifacts, folded into the system instruction
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageCounts {
    pub notes_generated: usize,
    pub quizzes_taken: usize,
    pub study_plans: usize,
}

impl SessionConfig {
    /// System instruction augmented with the user's usage statistics
    pub fn system_instruction_with_usage(&self, usage: &UsageCounts) -> String {
        format!(
            "{}\n\nSo far the user generated {} notes, took {} quizzes and made {} study plans.",
            self.system_instruction, usage.notes_generated, usage.quizzes_taken, usage.study_plans
        )
    }
}
