//! Error types for the export engine.
//!
//! The engine surfaces a closed set of error kinds. Each kind carries a
//! stable machine-readable code (see [`ExportError::code`]) that the HTTP
//! layer maps to a status code and an error envelope.
//!
//! # Error Kinds
//!
//! | Kind | Code | When |
//! |------|------|------|
//! | Validation | `validation_error` | Missing/unknown fields, unknown template or export type, bad filter key, conflicting data sources |
//! | TemplateLimitExceeded | `template_limit_exceeded` | Single-file request exceeds the template ceiling |
//! | Backpressure | `backpressure` | Concurrency gates saturated |
//! | SourceUnavailable | `source_unavailable` | Source adapter missing or failing |
//! | JobTimeout | `job_timeout` | Per-job deadline reached |
//! | ArtifactInvalid | `artifact_invalid` | Produced bytes failed the signature/size gate |
//! | NotFound | `not_found` | Unknown export id or batch index out of range |
//! | Expired | `expired` | Record exists but its retention window has passed |
//! | VariantMismatch | `variant_mismatch` | Download variant does not match the record's strategy |
//! | Internal | `internal_error` | Unexpected fault |

use thiserror::Error;

/// The primary error type for export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The request failed validation before any work was done.
    #[error("{0}")]
    Validation(String),

    /// A single-file export was requested for more records than the
    /// template permits in one file.
    #[error("template '{template}' allows at most {limit} records in a single file, got {requested}")]
    TemplateLimitExceeded {
        /// The template name.
        template: String,
        /// The single-file ceiling.
        limit: u64,
        /// The resolved record count.
        requested: u64,
    },

    /// One of the concurrency gates is saturated.
    #[error("too many concurrent export jobs, retry later")]
    Backpressure,

    /// The source adapter is missing or returned an unrecoverable error.
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    /// The per-job wall-clock deadline was reached.
    #[error("export job exceeded the {0}s deadline")]
    JobTimeout(u64),

    /// The writer or archiver produced bytes that failed validation.
    #[error("produced artifact failed validation: {0}")]
    ArtifactInvalid(String),

    /// Unknown export id, or a batch index out of range.
    #[error("{0}")]
    NotFound(String),

    /// The record exists but its retention window has passed.
    #[error("export '{0}' has expired")]
    Expired(String),

    /// The requested download variant does not apply to the record.
    #[error("{0}")]
    VariantMismatch(String),

    /// Unexpected fault.
    #[error("{0}")]
    Internal(String),
}

impl ExportError {
    /// Returns the stable machine-readable error code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ExportError::Validation(_) => "validation_error",
            ExportError::TemplateLimitExceeded { .. } => "template_limit_exceeded",
            ExportError::Backpressure => "backpressure",
            ExportError::SourceUnavailable(_) => "source_unavailable",
            ExportError::JobTimeout(_) => "job_timeout",
            ExportError::ArtifactInvalid(_) => "artifact_invalid",
            ExportError::NotFound(_) => "not_found",
            ExportError::Expired(_) => "expired",
            ExportError::VariantMismatch(_) => "variant_mismatch",
            ExportError::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        ExportError::Validation(message.into())
    }
}

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExportError::validation("x").code(), "validation_error");
        assert_eq!(ExportError::Backpressure.code(), "backpressure");
        assert_eq!(ExportError::JobTimeout(120).code(), "job_timeout");
        assert_eq!(
            ExportError::TemplateLimitExceeded {
                template: "standard".into(),
                limit: 15_000,
                requested: 15_001,
            }
            .code(),
            "template_limit_exceeded"
        );
    }

    #[test]
    fn display_mentions_deadline() {
        let err = ExportError::JobTimeout(300);
        assert!(err.to_string().contains("300"));
    }
}
