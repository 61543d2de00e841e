use crate::config::Config;
use crate::session::SessionManager;
use crate::speech::SpeechClient;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Single-owner manager for the active voice session
    pub manager: Arc<SessionManager>,

    /// Loaded application configuration (session defaults)
    pub config: Arc<Config>,

    /// One-shot text-to-speech client
    pub speech: Arc<SpeechClient>,
}

impl AppState {
    pub fn new(
        manager: Arc<SessionManager>,
        config: Arc<Config>,
        speech: Arc<SpeechClient>,
    ) -> Self {
        Self {
            manager,
            config,
            speech,
        }
    }
}
