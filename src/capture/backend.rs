use anyhow::{bail, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

/// A fixed-size block of mono float samples from the microphone path
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input sample rate (the live endpoint expects 16kHz)
    pub sample_rate: u32,
    /// Channel count (1 = mono)
    pub channels: u16,
    /// Samples per delivered frame
    pub frame_samples: usize,
    /// Request echo cancellation from the device
    pub echo_cancellation: bool,
    /// Request noise suppression from the device
    pub noise_suppression: bool,
    /// Request automatic gain control from the device
    pub auto_gain: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // Live endpoint expects 16kHz input
            channels: 1,        // Mono
            frame_samples: 4096,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain: true,
        }
    }
}

/// Root-mean-square amplitude of a frame's samples
///
/// Drives the UI liveness indicator only; frames are transmitted whether
/// active or silent.
pub fn activity_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Audio capture backend trait
///
/// The surface that owns the physical device sits behind this seam. UI
/// surfaces with their own audio data plane push samples through a
/// [`ChannelBackend`]; a device-owning backend would implement the same
/// contract.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive fixed-size frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the stream; repeated calls are a no-op
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Samples delivered by the embedding surface over its data plane
    Surface,
    /// A locally owned microphone device
    Microphone,
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given source
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<(Box<dyn CaptureBackend>, CaptureFeed)> {
        match source {
            CaptureSource::Surface => {
                let backend = ChannelBackend::new(config);
                let feed = backend.feed();
                Ok((Box::new(backend), feed))
            }
            CaptureSource::Microphone => {
                // Surfaces own the physical device; absence of a device
                // backend is reported as a permission-kind failure.
                bail!("Microphone capture is not available on this build")
            }
        }
    }
}

struct FeedState {
    tx: Option<mpsc::Sender<AudioFrame>>,
    pending: Vec<f32>,
    samples_emitted: u64,
}

/// Channel-fed capture backend
///
/// The surface pushes raw sample slices through the paired [`CaptureFeed`];
/// the backend segments them into fixed-size frames and delivers them on the
/// receiver returned by `start()`. Samples pushed while stopped are dropped.
pub struct ChannelBackend {
    config: CaptureConfig,
    state: Arc<Mutex<FeedState>>,
}

impl ChannelBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(FeedState {
                tx: None,
                pending: Vec::new(),
                samples_emitted: 0,
            })),
        }
    }

    /// Handle the surface uses to push captured samples
    pub fn feed(&self) -> CaptureFeed {
        CaptureFeed {
            config: self.config.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ChannelBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let mut state = self.state.lock().await;
        if state.tx.is_some() {
            bail!("Capture already started");
        }

        let (tx, rx) = mpsc::channel(64);
        state.tx = Some(tx);
        state.pending.clear();
        state.samples_emitted = 0;

        info!("Capture started ({} samples/frame)", self.config.frame_samples);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.tx.take().is_some() {
            state.pending.clear();
            info!("Capture stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        // try_lock avoids blocking a sync caller; a held lock means the
        // feed is mid-push, i.e. capturing.
        match self.state.try_lock() {
            Ok(state) => state.tx.is_some(),
            Err(_) => true,
        }
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Producer half of a [`ChannelBackend`]
#[derive(Clone)]
pub struct CaptureFeed {
    config: CaptureConfig,
    state: Arc<Mutex<FeedState>>,
}

impl CaptureFeed {
    /// Push raw samples; full frames are forwarded to the frame receiver
    pub async fn push(&self, samples: &[f32]) {
        let mut state = self.state.lock().await;

        let Some(tx) = state.tx.clone() else {
            // Not capturing; the surface raced a stop. Drop silently.
            return;
        };

        state.pending.extend_from_slice(samples);

        let frame_samples = self.config.frame_samples;
        while state.pending.len() >= frame_samples {
            let frame_data: Vec<f32> = state.pending.drain(..frame_samples).collect();
            let timestamp_ms =
                state.samples_emitted * 1000 / self.config.sample_rate.max(1) as u64;
            state.samples_emitted += frame_samples as u64;

            let frame = AudioFrame {
                samples: frame_data,
                sample_rate: self.config.sample_rate,
                channels: self.config.channels,
                timestamp_ms,
            };

            if tx.send(frame).await.is_err() {
                // Receiver gone: session tore down while we held samples.
                state.tx = None;
                state.pending.clear();
                break;
            }
        }
    }
}
