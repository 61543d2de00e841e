use super::clock::OutputClock;
use super::sink::AudioSink;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tracing::{debug, info};

/// Schedules streamed audio chunks for gapless back-to-back playback
///
/// Chunks arrive asynchronously with network jitter. Each one is scheduled at
/// `max(next_start_time, now)` on the output clock and `next_start_time`
/// advances by its duration, so consecutive chunks play without gaps or
/// overlap. All in-flight sources are tracked so an interruption can stop
/// them en masse.
pub struct PlaybackScheduler {
    clock: Arc<dyn OutputClock>,
    sink: Arc<dyn AudioSink>,
    sample_rate: u32,
    inner: Arc<Mutex<SchedulerInner>>,
}

struct SchedulerInner {
    next_start_time: f64,
    next_id: u64,
    active: HashMap<u64, ActiveSource>,
}

struct ActiveSource {
    start_at: f64,
    duration: f64,
    abort: AbortHandle,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn OutputClock>, sink: Arc<dyn AudioSink>, sample_rate: u32) -> Self {
        Self {
            clock,
            sink,
            sample_rate,
            inner: Arc::new(Mutex::new(SchedulerInner {
                next_start_time: 0.0,
                next_id: 0,
                active: HashMap::new(),
            })),
        }
    }

    /// Schedule a decoded chunk; returns the start time it was given
    pub async fn schedule(&self, samples: Vec<f32>, duration_secs: f64) -> f64 {
        let mut inner = self.inner.lock().await;

        let now = self.clock.now();
        let start_at = inner.next_start_time.max(now);
        inner.next_start_time = start_at + duration_secs;

        let id = inner.next_id;
        inner.next_id += 1;

        let clock = Arc::clone(&self.clock);
        let sink = Arc::clone(&self.sink);
        let sample_rate = self.sample_rate;
        let registry = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            let delay = start_at - clock.now();
            if delay > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }

            if let Err(e) = sink.play(samples, sample_rate).await {
                debug!("Playback sink rejected samples: {}", e);
            }

            if duration_secs > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(duration_secs)).await;
            }

            // Natural completion: the source removes itself.
            let mut inner = registry.lock().await;
            inner.active.remove(&id);
        });

        inner.active.insert(
            id,
            ActiveSource {
                start_at,
                duration: duration_secs,
                abort: task.abort_handle(),
            },
        );

        debug!(
            "Scheduled playback source {} at {:.3}s for {:.3}s",
            id, start_at, duration_secs
        );

        start_at
    }

    /// Stop every in-flight source and reset the output clock offset
    ///
    /// Sources that already finished are ignored. After this call the next
    /// scheduled chunk starts immediately instead of at a stale offset.
    pub async fn interrupt(&self) {
        let mut inner = self.inner.lock().await;

        let stopped = inner.active.len();
        for (_, source) in inner.active.drain() {
            source.abort.abort();
        }
        inner.next_start_time = 0.0;

        if stopped > 0 {
            info!("Playback interrupted: {} source(s) stopped", stopped);
        }
    }

    /// Number of sources currently scheduled or playing
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.active.len()
    }

    /// Where the next chunk would be appended on the output timeline
    pub async fn next_start_time(&self) -> f64 {
        self.inner.lock().await.next_start_time
    }

    /// (start, duration) pairs of the in-flight sources, for inspection
    pub async fn active_intervals(&self) -> Vec<(f64, f64)> {
        let inner = self.inner.lock().await;
        inner
            .active
            .values()
            .map(|s| (s.start_at, s.duration))
            .collect()
    }
}
