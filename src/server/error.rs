//! HTTP error responses

use crate::error::ProcessingError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Request-level failures with HTTP status mapping
///
/// Per-file processing failures never surface here; they are reported in the
/// batch result instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No files uploaded")]
    NoFiles,
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProcessingError> for ApiError {
    fn from(error: ProcessingError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NoFiles => (StatusCode::BAD_REQUEST, "No files uploaded").into_response(),
            Self::Multipart(e) => {
                tracing::warn!(error = %e, "Rejected multipart body");
                (e.status(), e.body_text()).into_response()
            },
            Self::Internal(detail) => {
                tracing::error!(detail, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            },
        }
    }
}
