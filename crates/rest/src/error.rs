//! Error types for the export HTTP API.
//!
//! Engine errors are mapped onto HTTP status codes and rendered as the
//! error envelope:
//!
//! ```json
//! { "status": "error", "message": "...", "error_code": "...", "request_id": "..." }
//! ```
//!
//! # Error Mapping
//!
//! | Engine kind | HTTP Status |
//! |-------------|-------------|
//! | validation_error | 400 |
//! | template_limit_exceeded | 400 |
//! | variant_mismatch | 400 |
//! | backpressure | 429 |
//! | source_unavailable | 503 |
//! | job_timeout | 504 |
//! | artifact_invalid | 500 |
//! | not_found | 404 |
//! | expired | 404 |
//! | internal_error | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_export::ExportError;
use std::fmt;

use crate::middleware::request_id::RequestId;

/// The primary error type for REST API operations.
///
/// Wraps an engine error together with the request id so every error
/// envelope is correlatable in the logs.
#[derive(Debug)]
pub struct RestError {
    /// The underlying engine error.
    pub source: ExportError,
    /// The request correlation id.
    pub request_id: String,
}

impl RestError {
    /// Wraps an engine error with a request id.
    pub fn new(source: ExportError, request_id: &RequestId) -> Self {
        Self {
            source,
            request_id: request_id.0.clone(),
        }
    }

    /// Returns a closure suitable for `map_err` in handlers.
    pub fn wrap(request_id: &RequestId) -> impl Fn(ExportError) -> RestError + '_ {
        move |source| RestError::new(source, request_id)
    }

    fn status(&self) -> StatusCode {
        match &self.source {
            ExportError::Validation(_)
            | ExportError::TemplateLimitExceeded { .. }
            | ExportError::VariantMismatch(_) => StatusCode::BAD_REQUEST,
            ExportError::Backpressure => StatusCode::TOO_MANY_REQUESTS,
            ExportError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExportError::JobTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ExportError::NotFound(_) | ExportError::Expired(_) => StatusCode::NOT_FOUND,
            ExportError::ArtifactInvalid(_) | ExportError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (request {})", self.source, self.request_id)
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({
            "status": "error",
            "message": self.source.to_string(),
            "error_code": self.source.code(),
            "request_id": self.request_id,
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;
