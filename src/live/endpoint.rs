use super::events::{ClientEvent, ServerEvent, SetupRequest};
use anyhow::Result;

/// An established duplex connection to the live endpoint
#[async_trait::async_trait]
pub trait LiveChannel: Send {
    /// Submit one outbound event
    async fn send(&mut self, event: ClientEvent) -> Result<()>;

    /// Next inbound event; `None` means the remote closed the connection
    async fn recv(&mut self) -> Option<Result<ServerEvent>>;

    /// Close the connection
    async fn close(&mut self) -> Result<()>;
}

/// Dialer for the live voice-dialogue endpoint
///
/// The production implementation opens a WebSocket; tests substitute a
/// channel-backed endpoint.
#[async_trait::async_trait]
pub trait LiveEndpoint: Send + Sync {
    /// Open a connection and submit the session-open parameters
    async fn open(&self, setup: SetupRequest) -> Result<Box<dyn LiveChannel>>;
}
