use anyhow::Result;
use tokio::sync::mpsc;

/// Output device seam for scheduled playback
///
/// The scheduler hands each source's samples to the sink at its start time.
/// UI surfaces that render audio themselves receive the samples over a
/// channel-backed sink; headless runs use the null sink.
#[async_trait::async_trait]
pub trait AudioSink: Send + Sync {
    /// Deliver samples for immediate rendering
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Forwards scheduled samples to an mpsc channel (the surface's data plane)
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<f32>>,
}

impl ChannelSink {
    /// Create a sink plus the receiver the surface drains
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Vec<f32>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl AudioSink for ChannelSink {
    async fn play(&self, samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
        // A closed receiver means the surface went away; playback is moot.
        let _ = self.tx.send(samples).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Discards all samples; used when no surface is attached
pub struct NullSink;

#[async_trait::async_trait]
impl AudioSink for NullSink {
    async fn play(&self, _samples: Vec<f32>, _sample_rate: u32) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}
