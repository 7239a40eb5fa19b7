//! Landmark types shared between the detector boundary and the EAR math.

use serde::{Deserialize, Serialize};

/// Positions of the six EAR points inside a detector's landmark list, in the
/// order outer-corner, upper-lid-1, upper-lid-2, inner-corner, lower-lid-1,
/// lower-lid-2.
pub type EyeLandmarkIndices = [usize; 6];

/// Left eye on the MediaPipe Face Mesh 468/478-point schema.
pub const MEDIAPIPE_LEFT_EYE: EyeLandmarkIndices = [33, 160, 158, 133, 153, 144];

/// Right eye on the MediaPipe Face Mesh 468/478-point schema.
pub const MEDIAPIPE_RIGHT_EYE: EyeLandmarkIndices = [362, 385, 387, 263, 373, 380];

/// Normalized coordinates may overshoot [0, 1] by this much when a face is
/// partly outside the frame; anything further is rejected.
pub const COORDINATE_MARGIN: f64 = 1.0;

/// A normalized landmark, `x` and `y` relative to image width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Finite and within `COORDINATE_MARGIN` of the unit square.
    pub fn is_plausible(&self) -> bool {
        let in_range = |v: f64| {
            v.is_finite() && (-COORDINATE_MARGIN..=1.0 + COORDINATE_MARGIN).contains(&v)
        };
        in_range(self.x) && in_range(self.y)
    }

    /// Pixel position, truncated to whole pixels.
    pub fn to_pixel(self, size: ImageSize) -> (f64, f64) {
        (
            (self.x * f64::from(size.width)).trunc(),
            (self.y * f64::from(size.height)).trunc(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// All landmarks the detector produced for one face.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks(pub Vec<LandmarkPoint>);

impl FaceLandmarks {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self(points)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<LandmarkPoint> {
        self.0.get(index).copied()
    }
}

/// One frame's detector output. An empty `faces` list means no face was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    #[serde(flatten)]
    pub size: ImageSize,
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

impl FrameLandmarks {
    /// The face that gets evaluated; detectors are run with a single-face budget.
    pub fn primary_face(&self) -> Option<&FaceLandmarks> {
        self.faces.first()
    }
}

/// Index tables for both eyes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndexTable {
    pub left: EyeLandmarkIndices,
    pub right: EyeLandmarkIndices,
}

impl Default for EyeIndexTable {
    fn default() -> Self {
        Self {
            left: MEDIAPIPE_LEFT_EYE,
            right: MEDIAPIPE_RIGHT_EYE,
        }
    }
}

impl EyeIndexTable {
    /// Smallest landmark count a face needs for both eyes to be extractable.
    pub fn required_len(&self) -> usize {
        self.left
            .iter()
            .chain(self.right.iter())
            .max()
            .map_or(0, |max| max + 1)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LandmarkError {
    #[error("landmark index {index} out of range for face with {len} points")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("landmark {index} has implausible coordinates ({x}, {y})")]
    InvalidCoordinate { index: usize, x: f64, y: f64 },
}

/// The six outline points of one eye.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeLandmarkSet {
    points: [LandmarkPoint; 6],
}

impl EyeLandmarkSet {
    pub const fn new(points: [LandmarkPoint; 6]) -> Self {
        Self { points }
    }

    pub fn from_face(
        face: &FaceLandmarks,
        indices: &EyeLandmarkIndices,
    ) -> Result<Self, LandmarkError> {
        let mut points = [LandmarkPoint::default(); 6];
        for (slot, &index) in points.iter_mut().zip(indices.iter()) {
            let point = face.get(index).ok_or(LandmarkError::IndexOutOfRange {
                index,
                len: face.len(),
            })?;
            if !point.is_plausible() {
                return Err(LandmarkError::InvalidCoordinate {
                    index,
                    x: point.x,
                    y: point.y,
                });
            }
            *slot = point;
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[LandmarkPoint; 6] {
        &self.points
    }

    pub fn outer_corner(&self) -> LandmarkPoint {
        self.points[0]
    }

    pub fn inner_corner(&self) -> LandmarkPoint {
        self.points[3]
    }
}
