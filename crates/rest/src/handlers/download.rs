//! Download handlers.
//!
//! Serve stored artifacts by id and variant with byte-accurate content
//! headers. The registry pin (an `Arc` on the record) keeps the buffers
//! alive for the duration of the response even if the sweeper evicts
//! the entry mid-download.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use helios_export::{Artifact, DownloadVariant, ExportError, ExportRecord, SourceAdapter};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::request_id::RequestId;
use crate::state::AppState;

/// Query parameters for the default download route.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Explicit variant selection: `single` or `zip`.
    #[serde(rename = "type")]
    pub variant: Option<String>,
}

/// Handler for the default download route.
///
/// # HTTP Request
///
/// `GET /export/{id}/download[?type=single|zip]`
///
/// Without a query, single-strategy records serve their workbook and
/// multi-strategy records serve their archive.
pub async fn download_handler<A>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
    Query(query): Query<DownloadQuery>,
    request_id: RequestId,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    let variant = match query.variant.as_deref() {
        None => DownloadVariant::Default,
        Some("single") => DownloadVariant::Single,
        Some("zip") => DownloadVariant::Archive,
        Some(other) => {
            return Err(RestError::new(
                ExportError::validation(format!(
                    "unknown download type '{}'; valid types: single, zip",
                    other
                )),
                &request_id,
            ));
        }
    };
    serve_variant(&state, &id, variant, &request_id)
}

/// Handler for batch downloads.
///
/// # HTTP Request
///
/// `GET /export/{id}/download/batch/{n}`
pub async fn download_batch_handler<A>(
    State(state): State<AppState<A>>,
    Path((id, batch)): Path<(String, u64)>,
    request_id: RequestId,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    serve_variant(&state, &id, DownloadVariant::Batch(batch), &request_id)
}

/// Handler for archive downloads.
///
/// # HTTP Request
///
/// `GET /export/{id}/download/zip`
pub async fn download_zip_handler<A>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
    request_id: RequestId,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    serve_variant(&state, &id, DownloadVariant::Archive, &request_id)
}

fn serve_variant<A>(
    state: &AppState<A>,
    id: &str,
    variant: DownloadVariant,
    request_id: &RequestId,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    let record = pin_live_record(state, id, request_id)?;
    let artifact = record
        .artifact_for(variant)
        .map_err(RestError::wrap(request_id))?;

    debug!(
        id = %id,
        variant = ?variant,
        bytes = artifact.len(),
        file = %artifact.suggested_filename,
        "Serving download"
    );

    Ok(artifact_response(artifact))
}

/// Looks up a record, rejecting unknown and expired ids.
fn pin_live_record<A>(
    state: &AppState<A>,
    id: &str,
    request_id: &RequestId,
) -> RestResult<Arc<ExportRecord>>
where
    A: SourceAdapter + 'static,
{
    let record = state.registry().lookup_and_pin(id).ok_or_else(|| {
        RestError::new(
            ExportError::NotFound(format!("export '{}' not found", id)),
            request_id,
        )
    })?;
    if record.is_expired(Utc::now()) {
        return Err(RestError::new(
            ExportError::Expired(record.id.clone()),
            request_id,
        ));
    }
    Ok(record)
}

/// Builds the byte response with content headers.
fn artifact_response(artifact: &Artifact) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.mime_type),
    );
    if let Ok(value) = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        artifact.suggested_filename
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(artifact.len()));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    (StatusCode::OK, headers, artifact.bytes.clone()).into_response()
}
