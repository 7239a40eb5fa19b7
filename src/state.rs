use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::{Config, DetectionConfig};
use crate::detector::{build_detector, LandmarkDetector};
use crate::middleware::rate_limit::RateLimiter;
use crate::sessions::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    detector: Arc<dyn LandmarkDetector>,
    sessions: Arc<SessionRegistry>,
    rate_limit: Arc<RateLimiter>,
    sse_connections: Arc<AtomicUsize>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        Self::with_detector(config, build_detector(&config.detector), shutdown_tx)
    }

    /// Same as `new` but with an explicit detector, e.g. a `FixedDetector`.
    pub fn with_detector(
        config: &Config,
        detector: Arc<dyn LandmarkDetector>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(
            config.detection.tracker,
            &config.sessions,
        ));
        let rate_limit = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            detector,
            sessions,
            rate_limit,
            sse_connections: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn detector(&self) -> &dyn LandmarkDetector {
        self.detector.as_ref()
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn rate_limit(&self) -> &Arc<RateLimiter> {
        &self.rate_limit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn detection(&self) -> &DetectionConfig {
        &self.config.detection
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Reserves an SSE slot; `None` when the configured cap is reached.
    pub fn try_acquire_sse_slot(&self) -> Option<SseSlot> {
        let max = self.config.limits.max_sse_connections;
        let current = self.sse_connections.fetch_add(1, Ordering::SeqCst);
        if current >= max {
            self.sse_connections.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(SseSlot {
            counter: self.sse_connections.clone(),
        })
    }

    pub fn sse_connections(&self) -> usize {
        self.sse_connections.load(Ordering::SeqCst)
    }
}

/// Releases its SSE slot when the stream is dropped.
pub struct SseSlot {
    counter: Arc<AtomicUsize>,
}

impl Drop for SseSlot {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
