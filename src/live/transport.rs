use super::endpoint::{LiveChannel, LiveEndpoint};
use super::events::{
    ClientEvent, Content, FunctionResponse, GenerationConfig, PrebuiltVoiceConfig, RealtimeInput,
    ServerContent, ServerEvent, SetupRequest, SpeechConfig, ToolList, ToolResponse,
    TranscriptionConfig, VoiceConfig,
};
use crate::codec::{self, EncodedFrame};
use crate::playback::PlaybackScheduler;
use crate::tools::{ToolDeclaration, ToolHandler};
use crate::transcript::{Message, TranscriptAssembler, TranscriptEvent};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Connection lifecycle of a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
    Errored,
}

/// Update published while a session runs
#[derive(Debug, Clone)]
pub enum TransportUpdate {
    StateChanged(TransportState),
    /// Current in-progress fragments for both speakers
    PartialTranscript { user: String, assistant: String },
    /// Messages flushed by a turn boundary, in user-then-assistant order
    TurnFlushed(Vec<Message>),
    /// Short user-visible error description
    Error(String),
}

/// Session-open parameters for the live endpoint
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub model: String,
    pub voice_name: String,
    pub system_instruction: String,
    pub tool_declarations: Vec<ToolDeclaration>,
    /// Enable input and output transcription on the session
    pub transcription: bool,
    /// Sample rate of inbound synthesized audio (24kHz)
    pub output_sample_rate: u32,
    /// Bound on connection establishment plus remote acknowledgment
    pub connect_timeout: Duration,
}

impl TransportOptions {
    fn setup_request(&self) -> SetupRequest {
        let tools = if self.tool_declarations.is_empty() {
            Vec::new()
        } else {
            vec![ToolList {
                function_declarations: self.tool_declarations.clone(),
            }]
        };

        let transcription = if self.transcription {
            Some(TranscriptionConfig::default())
        } else {
            None
        };

        SetupRequest {
            model: self.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice_name.clone(),
                        },
                    },
                }),
            },
            system_instruction: Some(Content::text(self.system_instruction.clone())),
            tools,
            input_audio_transcription: transcription.clone(),
            output_audio_transcription: transcription,
        }
    }
}

/// Owns the duplex connection to the live voice endpoint
///
/// Captured frames are accepted from the moment the transport is created;
/// an outbound queue holds them in submission order until the remote
/// acknowledges the session open, so no frame produced during `Connecting`
/// is lost. Inbound events are dispatched strictly in arrival order.
pub struct SessionTransport {
    frame_tx: mpsc::UnboundedSender<EncodedFrame>,
    state_rx: watch::Receiver<TransportState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionTransport {
    /// Open a session against the endpoint and start the dispatch loop
    #[allow(clippy::too_many_arguments)]
    pub fn connect(
        endpoint: Arc<dyn LiveEndpoint>,
        options: TransportOptions,
        scheduler: Arc<PlaybackScheduler>,
        tools: Arc<dyn ToolHandler>,
        messages: Arc<Mutex<Vec<Message>>>,
        updates: broadcast::Sender<TransportUpdate>,
    ) -> Self {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TransportState::Idle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_session(
            endpoint,
            options,
            scheduler,
            tools,
            messages,
            updates,
            frame_rx,
            state_tx,
            shutdown_rx,
        ));

        Self {
            frame_tx,
            state_rx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Submit a captured frame
    ///
    /// Never blocks and never fails: before the session is active the frame
    /// queues; after the session ended it is discarded harmlessly.
    pub fn send_frame(&self, frame: EncodedFrame) {
        let _ = self.frame_tx.send(frame);
    }

    /// Sender half of the outbound frame queue, for the uplink task
    pub fn frame_sender(&self) -> mpsc::UnboundedSender<EncodedFrame> {
        self.frame_tx.clone()
    }

    /// Current connection state
    pub fn state(&self) -> TransportState {
        *self.state_rx.borrow()
    }

    /// Watch handle for state transitions
    pub fn watch_state(&self) -> watch::Receiver<TransportState> {
        self.state_rx.clone()
    }

    /// Signal shutdown and wait for the session task to finish
    ///
    /// Idempotent; the task runs its teardown sequence exactly once.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Transport task panicked: {}", e);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    endpoint: Arc<dyn LiveEndpoint>,
    options: TransportOptions,
    scheduler: Arc<PlaybackScheduler>,
    tools: Arc<dyn ToolHandler>,
    messages: Arc<Mutex<Vec<Message>>>,
    updates: broadcast::Sender<TransportUpdate>,
    mut frame_rx: mpsc::UnboundedReceiver<EncodedFrame>,
    state_tx: watch::Sender<TransportState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let set_state = |state: TransportState| {
        let _ = state_tx.send(state);
        let _ = updates.send(TransportUpdate::StateChanged(state));
    };

    set_state(TransportState::Connecting);

    let mut channel =
        match open_acknowledged(endpoint.as_ref(), &options, &mut shutdown_rx).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                // Stopped while still connecting; nothing was acquired.
                set_state(TransportState::Closed);
                return;
            }
            Err(e) => {
                warn!("Live session failed to open: {:#}", e);
                let _ = updates.send(TransportUpdate::Error(
                    "Could not reach the voice assistant".to_string(),
                ));
                set_state(TransportState::Errored);
                return;
            }
        };

    info!("Live session active");
    set_state(TransportState::Active);

    let mut assembler = TranscriptAssembler::new();
    let mut errored = false;

    // Only the inbound arm may hold the channel inside the select; outbound
    // sends happen after a step resolves so the borrows never overlap.
    enum Step {
        Shutdown,
        Frame(Option<EncodedFrame>),
        Inbound(Option<Result<ServerEvent>>),
    }

    loop {
        let step = tokio::select! {
            _ = &mut shutdown_rx => Step::Shutdown,
            maybe_frame = frame_rx.recv() => Step::Frame(maybe_frame),
            maybe_event = channel.recv() => Step::Inbound(maybe_event),
        };

        match step {
            Step::Shutdown | Step::Frame(None) => break,
            Step::Frame(Some(frame)) => {
                let event = ClientEvent::RealtimeInput(RealtimeInput {
                    media_chunks: vec![frame.into()],
                });
                if let Err(e) = channel.send(event).await {
                    warn!("Failed to submit frame: {:#}", e);
                    errored = true;
                    break;
                }
            }
            Step::Inbound(Some(Ok(event))) => {
                if let Err(e) = dispatch_event(
                    event,
                    channel.as_mut(),
                    &scheduler,
                    tools.as_ref(),
                    &messages,
                    &mut assembler,
                    &updates,
                    options.output_sample_rate,
                )
                .await
                {
                    warn!("Inbound dispatch failed: {:#}", e);
                    errored = true;
                    break;
                }
            }
            Step::Inbound(Some(Err(e))) => {
                warn!("Live connection error: {:#}", e);
                errored = true;
                break;
            }
            Step::Inbound(None) => {
                info!("Live endpoint closed the session");
                break;
            }
        }
    }

    if errored {
        let _ = updates.send(TransportUpdate::Error(
            "Voice connection lost".to_string(),
        ));
        set_state(TransportState::Errored);
    } else {
        set_state(TransportState::Closing);
    }

    // Teardown: every step runs even if an earlier one fails.
    frame_rx.close();

    if let Err(e) = channel.close().await {
        warn!("Failed to close live connection: {:#}", e);
    }

    scheduler.interrupt().await;

    if !errored {
        set_state(TransportState::Closed);
    }

    info!("Live session finished");
}

/// Open the connection and wait for the remote session-open acknowledgment
///
/// Both steps share one connect timeout. Returns `Ok(None)` when a shutdown
/// arrived first; the pending open resolves harmlessly in the background.
async fn open_acknowledged(
    endpoint: &dyn LiveEndpoint,
    options: &TransportOptions,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Result<Option<Box<dyn LiveChannel>>> {
    let open = async {
        let mut channel = endpoint
            .open(options.setup_request())
            .await
            .context("Connection open rejected")?;

        loop {
            match channel.recv().await {
                Some(Ok(event)) if event.setup_complete.is_some() => return Ok(channel),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e).context("Connection failed during open"),
                None => return Err(anyhow!("Connection closed before acknowledgment")),
            }
        }
    };

    tokio::select! {
        result = timeout(options.connect_timeout, open) => {
            match result {
                Ok(Ok(channel)) => Ok(Some(channel)),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(anyhow!(
                    "Connection not acknowledged within {:?}",
                    options.connect_timeout
                )),
            }
        }
        _ = shutdown_rx => Ok(None),
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_event(
    event: ServerEvent,
    channel: &mut dyn LiveChannel,
    scheduler: &PlaybackScheduler,
    tools: &dyn ToolHandler,
    messages: &Mutex<Vec<Message>>,
    assembler: &mut TranscriptAssembler,
    updates: &broadcast::Sender<TransportUpdate>,
    output_sample_rate: u32,
) -> Result<()> {
    if let Some(tool_call) = event.tool_call {
        for call in tool_call.function_calls {
            let result = tools.invoke(&call.name, &call.args).await;
            let response = ClientEvent::ToolResponse(ToolResponse {
                function_responses: vec![FunctionResponse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    response: serde_json::json!({ "result": result }),
                }],
            });
            channel
                .send(response)
                .await
                .with_context(|| format!("Failed to answer tool call '{}'", call.name))?;
        }
    }

    if let Some(content) = event.server_content {
        handle_server_content(
            content,
            scheduler,
            messages,
            assembler,
            updates,
            output_sample_rate,
        )
        .await;
    }

    Ok(())
}

async fn handle_server_content(
    content: ServerContent,
    scheduler: &PlaybackScheduler,
    messages: &Mutex<Vec<Message>>,
    assembler: &mut TranscriptAssembler,
    updates: &broadcast::Sender<TransportUpdate>,
    output_sample_rate: u32,
) {
    if content.interrupted {
        scheduler.interrupt().await;
    }

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            let Some(blob) = part.inline_data else { continue };
            match codec::decode_frame(&blob.data, output_sample_rate, 1) {
                Ok(audio) => {
                    let duration = audio.duration_secs;
                    scheduler.schedule(audio.mono().to_vec(), duration).await;
                }
                Err(e) => {
                    // Transcription can still proceed for this turn.
                    warn!("Ignoring malformed inline audio: {:#}", e);
                }
            }
        }
    }

    let mut partials_changed = false;

    if let Some(transcription) = content.input_transcription {
        assembler.apply(TranscriptEvent::PartialUser(transcription.text));
        partials_changed = true;
    }

    if let Some(transcription) = content.output_transcription {
        assembler.apply(TranscriptEvent::PartialAssistant(transcription.text));
        partials_changed = true;
    }

    if content.turn_complete {
        let flushed = assembler.apply(TranscriptEvent::TurnComplete);
        if !flushed.is_empty() {
            let mut log = messages.lock().await;
            log.extend(flushed.iter().cloned());
            let _ = updates.send(TransportUpdate::TurnFlushed(flushed));
        }
        partials_changed = true;
    }

    if partials_changed {
        let _ = updates.send(TransportUpdate::PartialTranscript {
            user: assembler.user_partial().to_string(),
            assistant: assembler.assistant_partial().to_string(),
        });
    }
}
