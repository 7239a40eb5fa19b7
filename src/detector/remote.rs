use std::time::Duration;

use axum::http::header;
use drowsiness_core::{FaceLandmarks, LandmarkPoint};
use serde::Deserialize;

use super::{DetectorError, LandmarkDetector};
use crate::config::DetectorConfig;
use crate::frame::DecodedFrame;

const MAX_ERROR_BODY_CHARS: usize = 256;

/// Sends the encoded frame to a landmark-detection sidecar over HTTP.
///
/// Request: `POST <url>` with the raw image bytes and the image content type.
/// Response: `{"faces": [{"landmarks": [{"x": .., "y": ..}, ...]}]}` with
/// coordinates normalized to the image size.
#[derive(Debug, Clone)]
pub struct RemoteDetector {
    url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DetectorResponse {
    #[serde(default)]
    faces: Vec<DetectedFace>,
}

#[derive(Debug, Deserialize)]
struct DetectedFace {
    landmarks: Vec<LandmarkPoint>,
}

impl RemoteDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    timeout_secs = config.timeout_secs,
                    "Failed to build detector HTTP client, falling back to defaults without timeout"
                );
                reqwest::Client::new()
            });
        let api_key = Some(config.api_key.trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        Self {
            url: config.url.clone(),
            api_key,
            client,
        }
    }
}

#[axum::async_trait]
impl LandmarkDetector for RemoteDetector {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn detect(&self, frame: &DecodedFrame) -> Result<Vec<FaceLandmarks>, DetectorError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, frame.mime.as_str())
            .body(frame.bytes.clone());
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Api {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        let parsed: DetectorResponse = serde_json::from_slice(&bytes)
            .map_err(|e| DetectorError::Protocol(e.to_string()))?;

        tracing::debug!(faces = parsed.faces.len(), "landmark detector responded");
        Ok(parsed
            .faces
            .into_iter()
            .map(|face| FaceLandmarks::new(face.landmarks))
            .collect())
    }
}

fn map_transport_error(e: reqwest::Error) -> DetectorError {
    if e.is_timeout() {
        DetectorError::Timeout
    } else {
        DetectorError::Network(e.to_string())
    }
}
