use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use drowsiness_core::{evaluate_face, round_ear, FaceLandmarks, FrameLandmarks, ImageSize};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SESSION_ID, NO_FACE_MESSAGE, SESSION_ID_HEADER};
use crate::extractors::JsonBody;
use crate::frame::decode_data_url;
use crate::response::AppError;
use crate::sessions::FrameOutcome;
use crate::state::AppState;
use crate::validation::validate_session_id;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Data URL or bare base64 of a JPEG/PNG frame.
    #[serde(default)]
    pub image: Option<String>,
    /// Landmarks from client-side detection; used when `image` is absent.
    #[serde(default)]
    pub landmarks: Option<FrameLandmarks>,
    #[serde(default, alias = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DetectResponse {
    pub drowsy: bool,
    pub ear: f64,
    pub frames_below: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<FrameOutcome> for DetectResponse {
    fn from(outcome: FrameOutcome) -> Self {
        Self {
            drowsy: outcome.decision.drowsy,
            ear: round_ear(outcome.ear.unwrap_or(0.0)),
            frames_below: outcome.decision.frames_below,
            message: outcome.ear.is_none().then_some(NO_FACE_MESSAGE),
        }
    }
}

/// Where a frame's landmarks came from; decides who gets blamed for bad ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LandmarkSource {
    Client,
    Detector,
}

struct FrameFace {
    size: ImageSize,
    face: Option<FaceLandmarks>,
    source: LandmarkSource,
}

pub async fn detect(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<DetectRequest>,
) -> Result<Response, AppError> {
    let session_id = resolve_session_id(req.session_id.as_deref(), &headers)?;
    let frame = locate_face(&state, req).await?;

    let ear = match &frame.face {
        None => None,
        Some(face) => Some(
            evaluate_face(face, &state.detection().eye_indices, frame.size).map_err(|e| {
                match frame.source {
                    LandmarkSource::Client => {
                        AppError::bad_request("INVALID_LANDMARKS", &e.to_string())
                    }
                    LandmarkSource::Detector => {
                        AppError::bad_gateway("DETECTOR_ERROR", &e.to_string())
                    }
                }
            })?,
        ),
    };

    let outcome = state.sessions().evaluate(&session_id, ear).await;

    let mut response = Json(DetectResponse::from(outcome)).into_response();
    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    Ok(response)
}

/// Body field first, then the `x-session-id` header, then the shared default.
fn resolve_session_id(from_body: Option<&str>, headers: &HeaderMap) -> Result<String, AppError> {
    let invalid = |msg: &str| AppError::bad_request("INVALID_SESSION_ID", msg);

    let session_id = match (from_body, headers.get(SESSION_ID_HEADER)) {
        (Some(id), _) => id,
        (None, Some(value)) => value
            .to_str()
            .map_err(|_| invalid("Session id header must be visible ASCII"))?,
        (None, None) => DEFAULT_SESSION_ID,
    }
    .trim();

    validate_session_id(session_id).map_err(invalid)?;
    Ok(session_id.to_string())
}

async fn locate_face(state: &AppState, req: DetectRequest) -> Result<FrameFace, AppError> {
    if let Some(image) = req.image {
        let decoded = decode_data_url(&image)?;
        let faces = state.detector().detect(&decoded).await?;
        return Ok(FrameFace {
            size: decoded.size,
            face: faces.into_iter().next(),
            source: LandmarkSource::Detector,
        });
    }

    if let Some(landmarks) = req.landmarks {
        if landmarks.size.is_empty() {
            return Err(AppError::bad_request(
                "INVALID_LANDMARKS",
                "Landmark image width and height must be positive",
            ));
        }
        return Ok(FrameFace {
            size: landmarks.size,
            face: landmarks.faces.into_iter().next(),
            source: LandmarkSource::Client,
        });
    }

    Err(AppError::bad_request("NO_IMAGE", "No image provided"))
}
