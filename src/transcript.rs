use serde::{Deserialize, Serialize};

/// Who said a line of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One finished line in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Incremental transcription event from the live endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Fragment of what the user is saying
    PartialUser(String),
    /// Fragment of what the assistant is saying
    PartialAssistant(String),
    /// The current turn is over; flush accumulated fragments
    TurnComplete,
}

/// Accumulates partial transcripts for the current turn
///
/// Fragments arrive interleaved for both speakers. On `TurnComplete` the
/// non-empty buffers flush as messages in user-then-assistant order and the
/// buffers reset. A turn with nothing accumulated flushes nothing.
#[derive(Debug, Default)]
pub struct TranscriptAssembler {
    user_partial: String,
    assistant_partial: String,
}

impl TranscriptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event; returns the messages flushed by it (empty for partials)
    pub fn apply(&mut self, event: TranscriptEvent) -> Vec<Message> {
        match event {
            TranscriptEvent::PartialUser(fragment) => {
                self.user_partial.push_str(&fragment);
                Vec::new()
            }
            TranscriptEvent::PartialAssistant(fragment) => {
                self.assistant_partial.push_str(&fragment);
                Vec::new()
            }
            TranscriptEvent::TurnComplete => {
                let mut flushed = Vec::new();

                if !self.user_partial.is_empty() {
                    flushed.push(Message {
                        role: Role::User,
                        text: std::mem::take(&mut self.user_partial),
                    });
                }

                if !self.assistant_partial.is_empty() {
                    flushed.push(Message {
                        role: Role::Assistant,
                        text: std::mem::take(&mut self.assistant_partial),
                    });
                }

                flushed
            }
        }
    }

    /// In-progress user fragment for the current turn
    pub fn user_partial(&self) -> &str {
        &self.user_partial
    }

    /// In-progress assistant fragment for the current turn
    pub fn assistant_partial(&self) -> &str {
        &self.assistant_partial
    }
}
