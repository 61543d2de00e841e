// Shared test doubles for the live endpoint seam.
//
// `ScriptedEndpoint` stands in for the WebSocket dialer: every `open` hands
// the session a channel-backed connection and hands the test the other ends,
// so inbound events can be scripted and outbound events observed.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use sage_voice::live::{
    Blob, ClientEvent, Content, FunctionCall, LiveChannel, LiveEndpoint, Part, ServerContent,
    ServerEvent, SetupComplete, SetupRequest, ToolCall, Transcription,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

/// The test-side ends of one connection opened through [`ScriptedEndpoint`]
pub struct ScriptedConn {
    /// Session-open parameters the transport submitted
    pub setup: SetupRequest,
    /// Push inbound events into the session
    pub events_tx: mpsc::UnboundedSender<Result<ServerEvent>>,
    /// Observe outbound events the session sent
    pub sent_rx: mpsc::UnboundedReceiver<ClientEvent>,
}

/// Endpoint double producing channel-backed connections
pub struct ScriptedEndpoint {
    auto_ack: bool,
    refuse_open: bool,
    conns_tx: mpsc::UnboundedSender<ScriptedConn>,
    conns_rx: Mutex<mpsc::UnboundedReceiver<ScriptedConn>>,
    opened: AtomicUsize,
    open_channels: Arc<AtomicUsize>,
}

impl ScriptedEndpoint {
    /// Endpoint whose connections acknowledge the session open immediately
    pub fn new() -> Arc<Self> {
        Self::build(true, false)
    }

    /// Endpoint whose connections never acknowledge on their own; the test
    /// sends the acknowledgment when it chooses to
    pub fn unacknowledged() -> Arc<Self> {
        Self::build(false, false)
    }

    /// Endpoint that refuses every open
    pub fn refusing() -> Arc<Self> {
        Self::build(false, true)
    }

    fn build(auto_ack: bool, refuse_open: bool) -> Arc<Self> {
        let (conns_tx, conns_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            auto_ack,
            refuse_open,
            conns_tx,
            conns_rx: Mutex::new(conns_rx),
            opened: AtomicUsize::new(0),
            open_channels: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The next connection a session opened; panics after two seconds
    pub async fn next_conn(&self) -> ScriptedConn {
        let mut rx = self.conns_rx.lock().await;
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("endpoint dropped")
    }

    /// Total connections opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Connections opened and not yet closed
    pub fn open_channels(&self) -> usize {
        self.open_channels.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LiveEndpoint for ScriptedEndpoint {
    async fn open(&self, setup: SetupRequest) -> Result<Box<dyn LiveChannel>> {
        if self.refuse_open {
            return Err(anyhow!("connection refused"));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();

        if self.auto_ack {
            let _ = events_tx.send(Ok(ack_event()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open_channels.fetch_add(1, Ordering::SeqCst);

        let _ = self.conns_tx.send(ScriptedConn {
            setup,
            events_tx,
            sent_rx,
        });

        Ok(Box::new(ScriptedChannel {
            sent_tx,
            events_rx,
            open_channels: Arc::clone(&self.open_channels),
            closed: false,
        }))
    }
}

struct ScriptedChannel {
    sent_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<Result<ServerEvent>>,
    open_channels: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait::async_trait]
impl LiveChannel for ScriptedChannel {
    async fn send(&mut self, event: ClientEvent) -> Result<()> {
        self.sent_tx
            .send(event)
            .map_err(|_| anyhow!("test observer dropped"))
    }

    async fn recv(&mut self) -> Option<Result<ServerEvent>> {
        self.events_rx.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.open_channels.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Settable clock for driving the playback scheduler deterministically
pub struct TestClock {
    now: StdMutex<f64>,
}

impl TestClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: StdMutex::new(0.0),
        })
    }

    pub fn set(&self, now: f64) {
        *self.now.lock().unwrap() = now;
    }
}

impl sage_voice::playback::OutputClock for TestClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

/// Serve a fixed JSON reply on an ephemeral local port; returns the base URL
///
/// Stands in for the text-to-speech endpoint: every request gets the same
/// body back, whatever the path.
pub async fn spawn_tts(reply: Value) -> Result<String> {
    let app = axum::Router::new().fallback(move || {
        let reply = reply.clone();
        async move { axum::Json(reply) }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

/// Next outbound event on a connection; panics after two seconds
pub async fn recv_sent(conn: &mut ScriptedConn) -> ClientEvent {
    timeout(Duration::from_secs(2), conn.sent_rx.recv())
        .await
        .expect("timed out waiting for an outbound event")
        .expect("session closed the connection")
}

pub fn ack_event() -> ServerEvent {
    ServerEvent {
        setup_complete: Some(SetupComplete::default()),
        ..Default::default()
    }
}

pub fn tool_call_event(calls: Vec<(Option<&str>, &str, Value)>) -> ServerEvent {
    ServerEvent {
        tool_call: Some(ToolCall {
            function_calls: calls
                .into_iter()
                .map(|(id, name, args)| FunctionCall {
                    id: id.map(str::to_string),
                    name: name.to_string(),
                    args,
                })
                .collect(),
        }),
        ..Default::default()
    }
}

fn content_event(content: ServerContent) -> ServerEvent {
    ServerEvent {
        server_content: Some(content),
        ..Default::default()
    }
}

pub fn input_transcription_event(text: &str) -> ServerEvent {
    content_event(ServerContent {
        input_transcription: Some(Transcription {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

pub fn output_transcription_event(text: &str) -> ServerEvent {
    content_event(ServerContent {
        output_transcription: Some(Transcription {
            text: text.to_string(),
        }),
        ..Default::default()
    })
}

pub fn turn_complete_event() -> ServerEvent {
    content_event(ServerContent {
        turn_complete: true,
        ..Default::default()
    })
}

pub fn interrupted_event() -> ServerEvent {
    content_event(ServerContent {
        interrupted: true,
        ..Default::default()
    })
}

/// Model turn carrying one inline audio blob with the given base64 payload
pub fn inline_audio_event(data: &str) -> ServerEvent {
    content_event(ServerContent {
        model_turn: Some(Content {
            parts: vec![Part {
                text: None,
                inline_data: Some(Blob {
                    mime_type: "audio/pcm;rate=24000".to_string(),
                    data: data.to_string(),
                }),
            }],
        }),
        ..Default::default()
    })
}
