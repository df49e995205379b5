//! Translation of service failures into JSON error responses.

use crate::application::intake::IngestError;
use crate::application::registry::RegistryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// An HTTP-facing failure: a status code plus a human-readable message,
/// rendered as `{"message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::MissingOwner => StatusCode::BAD_REQUEST,
            RegistryError::NotFound => StatusCode::NOT_FOUND,
            RegistryError::Forbidden => StatusCode::FORBIDDEN,
            RegistryError::Ingest(IngestError::EmptyUpload) => StatusCode::BAD_REQUEST,
            RegistryError::Ingest(IngestError::TooLarge(_)) => StatusCode::PAYLOAD_TOO_LARGE,
            RegistryError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RegistryError::Library(_) | RegistryError::Cleanup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!("request failed: {}", err);
        }
        Self::new(status, err.to_string())
    }
}
