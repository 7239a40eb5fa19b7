use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use drowsiness_core::{FaceLandmarks, LandmarkPoint, MEDIAPIPE_LEFT_EYE, MEDIAPIPE_RIGHT_EYE};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::{json, Value};

/// Frames are 256x256 so that pixel coordinates are exact after denormalization.
pub const FRAME_PX: u32 = 256;

/// EAR of `open_face()`: lids 16px apart on a 40px wide eye.
pub const OPEN_EAR: f64 = 0.4;

/// EAR of `closed_face()`: lids 4px apart on a 40px wide eye.
pub const CLOSED_EAR: f64 = 0.1;

fn px(x: f64, y: f64) -> LandmarkPoint {
    LandmarkPoint::new(x / f64::from(FRAME_PX), y / f64::from(FRAME_PX))
}

fn eye_points(left_x: f64, gap: f64) -> [LandmarkPoint; 6] {
    let half = gap / 2.0;
    [
        px(left_x, 128.0),
        px(left_x + 10.0, 128.0 - half),
        px(left_x + 30.0, 128.0 - half),
        px(left_x + 40.0, 128.0),
        px(left_x + 30.0, 128.0 + half),
        px(left_x + 10.0, 128.0 + half),
    ]
}

/// A 478-point MediaPipe-shaped face whose eyes have the given lid gap in px.
pub fn face_with_gap(gap: f64) -> FaceLandmarks {
    let mut points = vec![px(128.0, 200.0); 478];
    for (slot, point) in MEDIAPIPE_LEFT_EYE.iter().zip(eye_points(60.0, gap)) {
        points[*slot] = point;
    }
    for (slot, point) in MEDIAPIPE_RIGHT_EYE.iter().zip(eye_points(150.0, gap)) {
        points[*slot] = point;
    }
    FaceLandmarks::new(points)
}

pub fn open_face() -> FaceLandmarks {
    face_with_gap(16.0)
}

pub fn closed_face() -> FaceLandmarks {
    face_with_gap(4.0)
}

/// `/detect` body carrying client-side landmarks for one face.
pub fn landmarks_body(face: &FaceLandmarks) -> Value {
    json!({
        "landmarks": {
            "width": FRAME_PX,
            "height": FRAME_PX,
            "faces": [face],
        }
    })
}

pub fn no_face_body() -> Value {
    json!({
        "landmarks": {"width": FRAME_PX, "height": FRAME_PX, "faces": []}
    })
}

pub fn png_data_url(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 90, 90])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    format!("data:image/png;base64,{}", STANDARD.encode(buf.into_inner()))
}
