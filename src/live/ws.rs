use super::endpoint::{LiveChannel, LiveEndpoint};
use super::events::{ClientEvent, ServerEvent, SetupRequest};
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// WebSocket dialer for the live voice endpoint
pub struct WsEndpoint {
    url: String,
    api_key: String,
}

impl WsEndpoint {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl LiveEndpoint for WsEndpoint {
    async fn open(&self, setup: SetupRequest) -> Result<Box<dyn LiveChannel>> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", self.url, separator, self.api_key);

        info!("Connecting to live endpoint");

        let (ws, _response) = connect_async(url.as_str())
            .await
            .context("Failed to connect to live endpoint")?;

        let mut channel = WsChannel { ws };
        channel
            .send(ClientEvent::Setup(setup))
            .await
            .context("Failed to send session setup")?;

        Ok(Box::new(channel))
    }
}

struct WsChannel {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl LiveChannel for WsChannel {
    async fn send(&mut self, event: ClientEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        self.ws
            .send(Message::Text(payload))
            .await
            .context("Failed to send event on live connection")?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent>> {
        loop {
            let message = match self.ws.next().await? {
                Ok(m) => m,
                Err(e) => return Some(Err(e).context("Live connection read failed")),
            };

            // The endpoint delivers JSON in both text and binary frames.
            let payload = match message {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(bytes) => bytes,
                Message::Close(frame) => {
                    info!("Live endpoint closed the connection: {:?}", frame);
                    return None;
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match serde_json::from_slice::<ServerEvent>(&payload) {
                Ok(event) => return Some(Ok(event)),
                Err(e) => {
                    // Skip rather than kill the session on one bad message.
                    warn!("Unparseable message from live endpoint: {}", e);
                    debug!("Offending payload: {} bytes", payload.len());
                    continue;
                }
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .context("Failed to close live connection")?;
        Ok(())
    }
}
