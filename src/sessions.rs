//! Per-session drowsiness state.
//!
//! Every subject gets its own tracker, keyed by a caller-chosen session id, so
//! overlapping requests for different subjects never share a streak counter.
//! Frames for the same session are serialized by the registry lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use drowsiness_core::{round_ear, Decision, DrowsinessTracker, TrackerConfig};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::config::SessionConfig;
use crate::constants::FRAME_EVENT_CHANNEL_CAPACITY;

#[derive(Debug, Clone)]
struct SessionEntry {
    tracker: DrowsinessTracker,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
    last_seen: Instant,
    frames_seen: u64,
    last_ear: Option<f64>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            tracker: DrowsinessTracker::new(),
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
            last_seen: Instant::now(),
            frames_seen: 0,
            last_ear: None,
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
        self.last_seen_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub frames_below: u32,
    pub drowsy: bool,
    pub frames_seen: u64,
    pub last_ear: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Published after every evaluated frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameEvent {
    pub session_id: String,
    pub drowsy: bool,
    pub ear: f64,
    pub frames_below: u32,
    pub no_face: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub decision: Decision,
    /// `None` when the frame had no face.
    pub ear: Option<f64>,
}

#[derive(Debug)]
pub struct SessionRegistry {
    tracker_config: TrackerConfig,
    max_sessions: usize,
    idle_ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
    events: broadcast::Sender<FrameEvent>,
}

impl SessionRegistry {
    pub fn new(tracker_config: TrackerConfig, config: &SessionConfig) -> Self {
        let (events, _) = broadcast::channel(FRAME_EVENT_CHANNEL_CAPACITY);
        Self {
            tracker_config,
            max_sessions: config.max_sessions.max(1),
            idle_ttl: Duration::from_secs(config.idle_ttl_secs),
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn tracker_config(&self) -> &TrackerConfig {
        &self.tracker_config
    }

    /// Runs one frame through the session's tracker, creating the session on
    /// first use.
    pub async fn evaluate(&self, session_id: &str, ear: Option<f64>) -> FrameOutcome {
        let mut map = self.entries.lock().await;

        if !map.contains_key(session_id) && map.len() >= self.max_sessions {
            evict_least_recent(&mut map);
        }

        let entry = map
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);
        let was_drowsy = entry.tracker.is_drowsy(&self.tracker_config);
        let decision = entry.tracker.update(ear, &self.tracker_config);
        entry.frames_seen += 1;
        entry.last_ear = ear;
        entry.touch();
        drop(map);

        if decision.drowsy && !was_drowsy {
            tracing::info!(
                session_id,
                frames_below = decision.frames_below,
                "session became drowsy"
            );
        } else {
            tracing::debug!(
                session_id,
                ?ear,
                frames_below = decision.frames_below,
                drowsy = decision.drowsy,
                "frame evaluated"
            );
        }

        // No subscribers is the common case.
        let _ = self.events.send(FrameEvent {
            session_id: session_id.to_string(),
            drowsy: decision.drowsy,
            ear: ear.map(round_ear).unwrap_or(0.0),
            frames_below: decision.frames_below,
            no_face: ear.is_none(),
        });

        FrameOutcome { decision, ear }
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        let map = self.entries.lock().await;
        map.get(session_id)
            .map(|entry| self.to_snapshot(session_id, entry))
    }

    /// Clears the streak but keeps the session. Returns the new snapshot.
    pub async fn reset(&self, session_id: &str) -> Option<SessionSnapshot> {
        let mut map = self.entries.lock().await;
        let entry = map.get_mut(session_id)?;
        entry.tracker.reset();
        entry.touch();
        Some(self.to_snapshot(session_id, entry))
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.entries.lock().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FrameEvent> {
        self.events.subscribe()
    }

    /// Drops sessions idle for longer than the configured TTL.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.lock().await;
        let before = map.len();
        map.retain(|_, entry| now.duration_since(entry.last_seen) <= self.idle_ttl);
        before - map.len()
    }

    fn to_snapshot(&self, session_id: &str, entry: &SessionEntry) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            frames_below: entry.tracker.frames_below(),
            drowsy: entry.tracker.is_drowsy(&self.tracker_config),
            frames_seen: entry.frames_seen,
            last_ear: entry.last_ear,
            created_at: entry.created_at,
            last_seen_at: entry.last_seen_at,
        }
    }
}

fn evict_least_recent(map: &mut HashMap<String, SessionEntry>) {
    let oldest = map
        .iter()
        .min_by_key(|(_, entry)| entry.last_seen)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        tracing::info!(session_id = %id, "evicting least recently seen session");
        map.remove(&id);
    }
}

pub async fn session_cleanup_loop(
    registry: Arc<SessionRegistry>,
    interval_secs: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let removed = registry.cleanup().await;
                if removed > 0 {
                    tracing::info!(removed, "session_cleanup: expired idle sessions");
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
