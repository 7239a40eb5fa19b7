//! Landmark detection boundary.
//!
//! Face detection and landmark localization run in an external model. The
//! service only needs, per frame, the normalized landmarks of each detected
//! face; everything behind `LandmarkDetector` is the collaborator's concern.

mod fixed;
mod remote;

use std::sync::Arc;

use drowsiness_core::FaceLandmarks;

use crate::config::{DetectorConfig, DetectorMode};
use crate::frame::DecodedFrame;

pub use fixed::{DisabledDetector, FixedDetector};
pub use remote::RemoteDetector;

#[axum::async_trait]
pub trait LandmarkDetector: Send + Sync {
    /// Short identifier reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Landmarks for every face found in the frame, empty when there is none.
    async fn detect(&self, frame: &DecodedFrame) -> Result<Vec<FaceLandmarks>, DetectorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("landmark detector is not configured")]
    Unavailable,
    #[error("landmark detector timed out")]
    Timeout,
    #[error("landmark detector network error: {0}")]
    Network(String),
    #[error("landmark detector error: status={status}, message={message}")]
    Api { status: u16, message: String },
    #[error("landmark detector returned an invalid payload: {0}")]
    Protocol(String),
}

/// Panics on configurations that can never serve a frame.
pub fn validate_config(config: &DetectorConfig) {
    if config.mode == DetectorMode::Remote && config.url.trim().is_empty() {
        panic!(
            "Invalid detector configuration: DETECTOR_MODE=remote requires DETECTOR_URL. \
             Set DETECTOR_URL or DETECTOR_MODE=disabled."
        );
    }
}

pub fn build_detector(config: &DetectorConfig) -> Arc<dyn LandmarkDetector> {
    match config.mode {
        DetectorMode::Disabled => Arc::new(DisabledDetector),
        DetectorMode::Remote => Arc::new(RemoteDetector::new(config)),
    }
}
