use drowsiness_core::FaceLandmarks;

use super::{DetectorError, LandmarkDetector};
use crate::frame::DecodedFrame;

/// Used when no detector is deployed; clients must submit landmarks themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDetector;

#[axum::async_trait]
impl LandmarkDetector for DisabledDetector {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn detect(&self, _frame: &DecodedFrame) -> Result<Vec<FaceLandmarks>, DetectorError> {
        Err(DetectorError::Unavailable)
    }
}

/// Returns the same faces for every frame. Handy for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    faces: Vec<FaceLandmarks>,
}

impl FixedDetector {
    pub fn new(faces: Vec<FaceLandmarks>) -> Self {
        Self { faces }
    }

    pub fn single(face: FaceLandmarks) -> Self {
        Self { faces: vec![face] }
    }

    pub fn no_face() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl LandmarkDetector for FixedDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn detect(&self, _frame: &DecodedFrame) -> Result<Vec<FaceLandmarks>, DetectorError> {
        Ok(self.faces.clone())
    }
}

#[cfg(test)]
mod tests {
    use drowsiness_core::{ImageSize, LandmarkPoint};

    use super::*;

    fn frame() -> DecodedFrame {
        DecodedFrame {
            bytes: vec![0; 4],
            mime: "image/png".to_string(),
            size: ImageSize::new(1, 1),
        }
    }

    #[tokio::test]
    async fn disabled_detector_is_unavailable() {
        let result = DisabledDetector.detect(&frame()).await;
        assert!(matches!(result, Err(DetectorError::Unavailable)));
    }

    #[tokio::test]
    async fn fixed_detector_repeats_faces() {
        let face = FaceLandmarks::new(vec![LandmarkPoint::new(0.1, 0.2)]);
        let detector = FixedDetector::single(face.clone());
        assert_eq!(detector.detect(&frame()).await.unwrap(), vec![face.clone()]);
        assert_eq!(detector.detect(&frame()).await.unwrap(), vec![face]);
        assert!(FixedDetector::no_face()
            .detect(&frame())
            .await
            .unwrap()
            .is_empty());
    }
}
