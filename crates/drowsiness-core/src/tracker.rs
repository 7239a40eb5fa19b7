//! Consecutive-frame drowsiness tracker
//!
//! A single closed-eye frame is usually a blink. The tracker only reports
//! drowsiness once `consec_frames` consecutive frames have an EAR below the
//! threshold. Any open-eye frame, or a frame without a face, restarts the count.

use serde::{Deserialize, Serialize};

pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;
pub const DEFAULT_CONSEC_FRAMES: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// EAR strictly below this value counts as a closed-eye frame.
    pub ear_threshold: f64,
    /// Streak length at which the subject is reported drowsy.
    pub consec_frames: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consec_frames: DEFAULT_CONSEC_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    #[default]
    Reset,
    BelowStreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub drowsy: bool,
    pub frames_below: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrowsinessTracker {
    phase: TrackerPhase,
    frames_below: u32,
}

impl DrowsinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one frame. `None` means the detector found no face.
    pub fn update(&mut self, ear: Option<f64>, config: &TrackerConfig) -> Decision {
        let Some(ear) = ear else {
            self.reset();
            return Decision {
                drowsy: false,
                frames_below: 0,
            };
        };

        if ear < config.ear_threshold {
            self.phase = TrackerPhase::BelowStreak;
            self.frames_below = self.frames_below.saturating_add(1);
        } else {
            self.reset();
        }

        Decision {
            drowsy: self.is_drowsy(config),
            frames_below: self.frames_below,
        }
    }

    pub fn reset(&mut self) {
        self.phase = TrackerPhase::Reset;
        self.frames_below = 0;
    }

    pub fn frames_below(&self) -> u32 {
        self.frames_below
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn is_drowsy(&self, config: &TrackerConfig) -> bool {
        self.frames_below >= config.consec_frames
    }
}
