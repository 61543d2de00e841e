use super::config::{SessionConfig, UsageCounts};
use super::session::VoiceSession;
use super::stats::SessionStats;
use crate::live::LiveEndpoint;
use crate::playback::AudioSink;
use crate::tools::ToolHandler;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Keeps mutually exclusive voice surfaces from capturing at the same time
///
/// Each UI surface (full assistant view, floating mini-companion) activates
/// its own session through the manager; activating one always stops whatever
/// was live before, so only one surface ever holds the microphone.
pub struct SessionManager {
    endpoint: Arc<dyn LiveEndpoint>,
    tools: Arc<dyn ToolHandler>,
    current: Mutex<Option<Arc<VoiceSession>>>,
}

impl SessionManager {
    pub fn new(endpoint: Arc<dyn LiveEndpoint>, tools: Arc<dyn ToolHandler>) -> Self {
        Self {
            endpoint,
            tools,
            current: Mutex::new(None),
        }
    }

    /// Start a session for a surface, stopping any prior surface first
    pub async fn activate(
        &self,
        config: SessionConfig,
        usage: UsageCounts,
        sink: Arc<dyn AudioSink>,
    ) -> Result<Arc<VoiceSession>> {
        let mut current = self.current.lock().await;

        if let Some(previous) = current.take() {
            info!("Replacing active voice surface");
            if let Err(e) = previous.stop().await {
                warn!("Failed to stop previous session cleanly: {:#}", e);
            }
        }

        let session = Arc::new(VoiceSession::new(
            config,
            Arc::clone(&self.endpoint),
            Arc::clone(&self.tools),
            sink,
        ));
        session.start(&usage).await?;

        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Stop the active session, if any
    pub async fn deactivate(&self) -> Result<Option<SessionStats>> {
        let mut current = self.current.lock().await;

        match current.take() {
            Some(session) => {
                let stats = session.stop().await?;
                Ok(Some(stats))
            }
            None => Ok(None),
        }
    }

    /// The currently active session, if any
    pub async fn current(&self) -> Option<Arc<VoiceSession>> {
        self.current.lock().await.clone()
    }
}
