use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

/// Error payload. `error` repeats the message for capture pages that only
/// look at that field.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub error: String,
    pub trace_id: Option<String>,
}

impl ErrorBody {
    pub fn new(code: &str, message: &str, trace_id: Option<String>) -> Self {
        Self {
            success: false,
            code: code.to_string(),
            message: message.to_string(),
            error: message.to_string(),
            trace_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub is_operational: bool,
}

impl AppError {
    pub fn bad_request(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn too_many_requests(message: &str) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "RATE_LIMITED".to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn bad_gateway(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn service_unavailable(code: &str, message: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: code.to_string(),
            message: message.to_string(),
            is_operational: true,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.to_string(),
            is_operational: false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let exposed_message = if self.is_operational {
            self.message.clone()
        } else {
            "Internal server error".to_string()
        };

        if self.is_operational {
            tracing::warn!(status = %self.status, code = %self.code, error = %self.message, "API error");
        } else {
            tracing::error!(status = %self.status, code = %self.code, error = %self.message, "Internal API error");
        }

        (
            self.status,
            Json(ErrorBody::new(&self.code, &exposed_message, None)),
        )
            .into_response()
    }
}

// Client-supplied image problems are the caller's fault and safe to echo back.
impl From<crate::frame::FrameError> for AppError {
    fn from(value: crate::frame::FrameError) -> Self {
        AppError::bad_request(
            "INVALID_IMAGE",
            &format!("Could not decode image: {value}"),
        )
    }
}

// Detector failures map to gateway errors; the detector sits behind this service.
impl From<crate::detector::DetectorError> for AppError {
    fn from(value: crate::detector::DetectorError) -> Self {
        match &value {
            crate::detector::DetectorError::Unavailable => AppError::service_unavailable(
                "DETECTOR_UNAVAILABLE",
                "No landmark detector is configured; submit landmarks instead",
            ),
            _ => AppError::bad_gateway("DETECTOR_ERROR", &value.to_string()),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data,
        }),
    )
}
