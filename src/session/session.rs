use super::config::{SessionConfig, UsageCounts};
use super::stats::SessionStats;
use crate::capture::{
    activity_level, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureFeed,
    CaptureSource,
};
use crate::codec;
use crate::live::{
    LiveEndpoint, SessionTransport, TransportOptions, TransportState, TransportUpdate,
};
use crate::playback::{AudioSink, MonotonicClock, PlaybackScheduler};
use crate::tools::ToolHandler;
use crate::transcript::Message;
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A voice session coordinating capture, transport, playback and transcripts
///
/// At most one pipeline is live per session: starting while active first
/// tears the previous pipeline down completely, so there is never more than
/// one capture stream or one remote connection.
pub struct VoiceSession {
    /// Session configuration
    config: SessionConfig,

    /// Dialer for the live voice endpoint
    endpoint: Arc<dyn LiveEndpoint>,

    /// Tool-call handler answering the model's structured intents
    tools: Arc<dyn ToolHandler>,

    /// Output device seam for scheduled playback
    sink: Arc<dyn AudioSink>,

    /// When the current pipeline started
    started_at: Mutex<chrono::DateTime<Utc>>,

    /// Whether a pipeline is currently live
    active: Arc<AtomicBool>,

    /// Number of capture frames submitted
    frames_sent: Arc<AtomicUsize>,

    /// Conversation log, flushed per turn by the transport
    messages: Arc<Mutex<Vec<Message>>>,

    /// Broadcast of transcript/state/error updates for the UI surface
    updates_tx: broadcast::Sender<TransportUpdate>,

    /// Latest microphone activity level (RMS) for the liveness indicator
    activity_tx: Arc<watch::Sender<f32>>,
    activity_rx: watch::Receiver<f32>,

    /// The live pipeline's resources; `None` while stopped
    pipeline: Arc<Mutex<Option<ActivePipeline>>>,

    /// Bumped on every start so stale supervisors cannot tear down a
    /// replacement pipeline
    generation: AtomicU64,
}

struct ActivePipeline {
    generation: u64,
    backend: Box<dyn CaptureBackend>,
    feed: CaptureFeed,
    transport: SessionTransport,
    uplink: JoinHandle<()>,
}

impl VoiceSession {
    pub fn new(
        config: SessionConfig,
        endpoint: Arc<dyn LiveEndpoint>,
        tools: Arc<dyn ToolHandler>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let (updates_tx, _) = broadcast::channel(64);
        let (activity_tx, activity_rx) = watch::channel(0.0);

        Self {
            config,
            endpoint,
            tools,
            sink,
            started_at: Mutex::new(Utc::now()),
            active: Arc::new(AtomicBool::new(false)),
            frames_sent: Arc::new(AtomicUsize::new(0)),
            messages: Arc::new(Mutex::new(Vec::new())),
            updates_tx,
            activity_tx: Arc::new(activity_tx),
            activity_rx,
            pipeline: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Start the session pipeline
    ///
    /// A session already active is fully stopped first, so both the capture
    /// stream and the remote connection are singletons after this settles.
    pub async fn start(&self, usage: &UsageCounts) -> Result<()> {
        if self.active.load(Ordering::SeqCst) {
            warn!("Voice session already active; restarting");
            teardown_pipeline(&self.pipeline, None, &self.active, &self.activity_tx).await;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!("Starting voice session: {}", self.config.session_id);

        let capture_config = CaptureConfig {
            sample_rate: self.config.input_sample_rate,
            channels: 1,
            frame_samples: self.config.frame_samples,
            ..CaptureConfig::default()
        };

        let (mut backend, feed) =
            CaptureBackendFactory::create(CaptureSource::Surface, capture_config)
                .context("Failed to create capture backend")?;

        let mut frame_rx = backend
            .start()
            .await
            .context("Failed to start audio capture")?;

        let scheduler = Arc::new(PlaybackScheduler::new(
            Arc::new(MonotonicClock::new()),
            Arc::clone(&self.sink),
            self.config.output_sample_rate,
        ));

        let options = TransportOptions {
            model: self.config.model.clone(),
            voice_name: self.config.voice_name.clone(),
            system_instruction: self.config.system_instruction_with_usage(usage),
            tool_declarations: self.config.tool_declarations.clone(),
            transcription: true,
            output_sample_rate: self.config.output_sample_rate,
            connect_timeout: self.config.connect_timeout,
        };

        let transport = SessionTransport::connect(
            Arc::clone(&self.endpoint),
            options,
            scheduler,
            Arc::clone(&self.tools),
            Arc::clone(&self.messages),
            self.updates_tx.clone(),
        );

        // Uplink: every captured frame is metered and submitted, silent or
        // not; the transport queues frames until the connection is live.
        let frame_tx = transport.frame_sender();
        let activity_tx = Arc::clone(&self.activity_tx);
        let frames_sent = Arc::clone(&self.frames_sent);

        let uplink = tokio::spawn(async move {
            info!("Uplink task started");

            while let Some(frame) = frame_rx.recv().await {
                let _ = activity_tx.send(activity_level(&frame.samples));

                let encoded = codec::encode_frame(&frame.samples);
                if frame_tx.send(encoded).is_err() {
                    break;
                }
                frames_sent.fetch_add(1, Ordering::SeqCst);
            }

            info!("Uplink task stopped");
        });

        let mut state_rx = transport.watch_state();

        {
            let mut slot = self.pipeline.lock().await;
            *slot = Some(ActivePipeline {
                generation,
                backend,
                feed,
                transport,
                uplink,
            });
        }

        *self.started_at.lock().await = Utc::now();
        self.frames_sent.store(0, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);

        // Supervisor: a transport that errors or is closed by the remote
        // must still release the capture stream. The generation guard keeps
        // it from touching a pipeline that replaced the one it watches.
        let pipeline = Arc::clone(&self.pipeline);
        let active = Arc::clone(&self.active);
        let supervisor_activity = Arc::clone(&self.activity_tx);

        tokio::spawn(async move {
            loop {
                let state = *state_rx.borrow();
                if matches!(state, TransportState::Errored | TransportState::Closed) {
                    teardown_pipeline(&pipeline, Some(generation), &active, &supervisor_activity)
                        .await;
                    break;
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        info!("Voice session started successfully");

        Ok(())
    }

    /// Stop the session; repeated calls are a no-op
    pub async fn stop(&self) -> Result<SessionStats> {
        if !self.active.load(Ordering::SeqCst) {
            warn!("Voice session not active");
            return self.stats().await;
        }

        info!("Stopping voice session: {}", self.config.session_id);
        teardown_pipeline(&self.pipeline, None, &self.active, &self.activity_tx).await;
        info!("Voice session stopped successfully");

        self.stats().await
    }

    /// Current session statistics
    pub async fn stats(&self) -> Result<SessionStats> {
        let started_at = *self.started_at.lock().await;
        let duration = Utc::now().signed_duration_since(started_at);

        let state = {
            let pipeline = self.pipeline.lock().await;
            pipeline
                .as_ref()
                .map(|p| p.transport.state())
                .unwrap_or(TransportState::Idle)
        };

        let message_count = self.messages.lock().await.len();

        Ok(SessionStats {
            state,
            started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            message_count,
            activity_level: *self.activity_rx.borrow(),
        })
    }

    /// Accumulated conversation log
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Handle the surface uses to push captured samples, while active
    pub async fn capture_feed(&self) -> Option<CaptureFeed> {
        let pipeline = self.pipeline.lock().await;
        pipeline.as_ref().map(|p| p.feed.clone())
    }

    /// Subscribe to transcript/state/error updates
    pub fn subscribe(&self) -> broadcast::Receiver<TransportUpdate> {
        self.updates_tx.subscribe()
    }

    /// Watch the microphone activity level
    pub fn watch_activity(&self) -> watch::Receiver<f32> {
        self.activity_rx.clone()
    }

    /// Whether a pipeline is currently live
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Release every pipeline resource, in order, each step guarded
///
/// Capture stops first so no further frames are forwarded, the uplink task
/// drains, then the transport closes the connection and clears playback.
/// A failing step never prevents the following ones. With `only_generation`
/// set, a pipeline of any other generation is left alone.
async fn teardown_pipeline(
    pipeline: &Mutex<Option<ActivePipeline>>,
    only_generation: Option<u64>,
    active: &AtomicBool,
    activity_tx: &watch::Sender<f32>,
) {
    let taken = {
        let mut slot = pipeline.lock().await;
        match (&*slot, only_generation) {
            (Some(current), Some(generation)) if current.generation != generation => None,
            _ => slot.take(),
        }
    };

    let Some(mut taken) = taken else {
        return;
    };

    if let Err(e) = taken.backend.stop().await {
        error!("Failed to stop capture backend: {}", e);
    }

    if let Err(e) = taken.uplink.await {
        error!("Uplink task panicked: {}", e);
    }

    taken.transport.stop().await;

    active.store(false, Ordering::SeqCst);
    let _ = activity_tx.send(0.0);
}
