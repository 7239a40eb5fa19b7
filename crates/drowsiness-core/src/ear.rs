//! EAR (Eye Aspect Ratio) computation
//!
//! Six-point formula: EAR = (|p1-p5| + |p2-p4|) / (2 * |p0-p3|)
//! - p0, p3: eye corners (horizontal span)
//! - p1, p2: upper lid
//! - p4, p5: lower lid
//!
//! Points are denormalized to whole pixels before measuring, so the ratio is
//! taken in image space rather than on the unit square.

use crate::landmarks::{EyeIndexTable, EyeLandmarkSet, FaceLandmarks, ImageSize, LandmarkError};

const EAR_DECIMALS: i32 = 4;

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// EAR of a single eye. Returns 0.0 when the horizontal span collapses.
pub fn compute_ear(eye: &EyeLandmarkSet, size: ImageSize) -> f64 {
    let p = eye.points().map(|point| point.to_pixel(size));

    let vertical1 = distance(p[1], p[5]);
    let vertical2 = distance(p[2], p[4]);
    let horizontal = distance(p[0], p[3]);
    if horizontal == 0.0 {
        return 0.0;
    }

    (vertical1 + vertical2) / (2.0 * horizontal)
}

/// Binocular EAR: mean of both eyes.
pub fn frame_ear(left: &EyeLandmarkSet, right: &EyeLandmarkSet, size: ImageSize) -> f64 {
    (compute_ear(left, size) + compute_ear(right, size)) / 2.0
}

/// Extracts both eyes from a face with the given index table and averages them.
pub fn evaluate_face(
    face: &FaceLandmarks,
    table: &EyeIndexTable,
    size: ImageSize,
) -> Result<f64, LandmarkError> {
    let left = EyeLandmarkSet::from_face(face, &table.left)?;
    let right = EyeLandmarkSet::from_face(face, &table.right)?;
    Ok(frame_ear(&left, &right, size))
}

/// Rounds to the precision reported to clients.
pub fn round_ear(ear: f64) -> f64 {
    let scale = 10_f64.powi(EAR_DECIMALS);
    (ear * scale).round() / scale
}
