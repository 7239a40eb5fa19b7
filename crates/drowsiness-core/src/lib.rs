//! Drowsiness core
//!
//! Eye-openness geometry and the consecutive-frame drowsiness state machine.
//! Face detection and landmark localization happen elsewhere; this crate only
//! consumes normalized landmark coordinates produced by an external detector.
//!
//! ## Modules
//! - `landmarks`: landmark points, eye landmark sets and the index tables that
//!   map a detector's landmark list onto the six EAR points
//! - `ear`: EAR (Eye Aspect Ratio) computation
//! - `tracker`: consecutive below-threshold frame counter

pub mod ear;
pub mod landmarks;
pub mod tracker;

pub use ear::{compute_ear, evaluate_face, frame_ear, round_ear};
pub use landmarks::{
    EyeIndexTable, EyeLandmarkIndices, EyeLandmarkSet, FaceLandmarks, FrameLandmarks, ImageSize,
    LandmarkError, LandmarkPoint, COORDINATE_MARGIN, MEDIAPIPE_LEFT_EYE, MEDIAPIPE_RIGHT_EYE,
};
pub use tracker::{Decision, DrowsinessTracker, TrackerConfig, TrackerPhase};
