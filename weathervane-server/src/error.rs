// weathervane-server/src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, warn};

use weathervane_common::ServiceError;

/// Handler result type: success bodies are JSON, failures are translated
/// at this boundary into an HTTP status plus a JSON error body.
pub type ApiResult<T> = Result<T, ApiError>;

/// A [`ServiceError`] on its way out of the service, optionally carrying
/// extra response fields (for example the accepted `valid_types` set).
pub struct ApiError {
    error: ServiceError,
    detail: Option<Value>,
}

impl ApiError {
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        ApiError { error, detail: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, mut body) = match &self.error {
            ServiceError::InvalidParameter(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            ServiceError::InsufficientData { available, required } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Not enough data to make a prediction.",
                    "available": available,
                    "required": required,
                }),
            ),
            ServiceError::QuotaExceeded { limit, count } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": "Monthly request limit reached",
                    "limit": limit,
                    "current_count": count,
                }),
            ),
            ServiceError::UpstreamTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({
                    "error": "Service timeout",
                    "message": "The weather service did not respond in time",
                    "suggestion": "Please try again later",
                }),
            ),
            ServiceError::UpstreamHttp { status, message } => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": "Weather service error",
                    "status_code": status,
                    "message": message,
                }),
            ),
            ServiceError::StorageUnavailable(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Storage unavailable", "message": message }),
            ),
            ServiceError::ModelInference(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Model inference failed", "message": message }),
            ),
            ServiceError::Unexpected(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Unexpected error", "message": message }),
            ),
        };

        if let (Some(extra), Some(object)) = (self.detail, body.as_object_mut()) {
            if let Some(fields) = extra.as_object() {
                for (key, value) in fields {
                    object.insert(key.clone(), value.clone());
                }
            }
        }

        if status.is_server_error() {
            error!("request failed: {}", self.error);
        } else {
            warn!("request rejected: {}", self.error);
        }

        (status, Json(body)).into_response()
    }
}
