//! Export creation handler.
//!
//! `POST /export/{type}` runs one export job to completion and returns
//! its metadata; the artifacts stay in the registry for download.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use helios_export::{
    DownloadVariant, ExportError, ExportRecord, ExportRequest, ExportType, SourceAdapter,
};
use serde_json::json;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::request_id::RequestId;
use crate::responses::success;
use crate::state::AppState;

/// Handler for the create interaction.
///
/// # HTTP Request
///
/// `POST /export/{type}` with an `ExportRequest` JSON body, where
/// `type ∈ {participants, payments, ambassadors}`.
///
/// # Response
///
/// - `200 OK` - Success envelope with export metadata
/// - `400 Bad Request` - Validation failure
/// - `429 Too Many Requests` - Concurrency gates saturated
/// - `503 Service Unavailable` - Source adapter unreachable
/// - `504 Gateway Timeout` - Per-job deadline reached
pub async fn create_export_handler<A>(
    State(state): State<AppState<A>>,
    Path(export_type): Path<String>,
    request_id: RequestId,
    Json(body): Json<serde_json::Value>,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    debug!(
        export_type = %export_type,
        request_id = %request_id.as_str(),
        "Processing export request"
    );

    let export_type: ExportType = export_type
        .parse()
        .map_err(|e: String| RestError::new(ExportError::Validation(e), &request_id))?;

    // Deserialize by hand so unknown option keys surface in the error
    // envelope rather than as a bare body rejection.
    let request: ExportRequest = serde_json::from_value(body).map_err(|e| {
        RestError::new(
            ExportError::validation(format!("invalid export request: {}", e)),
            &request_id,
        )
    })?;

    let record = state
        .coordinator()
        .run(export_type, request)
        .await
        .map_err(RestError::wrap(&request_id))?;

    let data = export_data(&record, state.base_url());
    Ok(success(data, Some(&record.metrics)).into_response())
}

/// Builds the `data` payload of the create response.
pub fn export_data(record: &ExportRecord, base_url: &str) -> serde_json::Value {
    let primary = record
        .artifact_for(DownloadVariant::Default)
        .map(|a| (a.suggested_filename.clone(), a.len()))
        .unwrap_or_default();

    let mut data = json!({
        "export_id": record.id,
        "strategy": record.strategy,
        "export_type": record.export_type,
        "template": record.template_name,
        "file_name": primary.0,
        "file_size": primary.1,
        "record_count": record.record_count,
        "download_url": format!("{}/export/{}/download", base_url, record.id),
        "created_at": record.created_at.to_rfc3339(),
        "expires_at": record.expires_at.to_rfc3339(),
    });

    let spans = record.chunk_spans();
    if !spans.is_empty() {
        let individual_files: Vec<serde_json::Value> = spans
            .iter()
            .filter_map(|span| {
                let chunk = record.artifact_for(DownloadVariant::Batch(span.index)).ok()?;
                Some(json!({
                    "batch_number": span.index,
                    "file_name": chunk.suggested_filename,
                    "file_size": chunk.len(),
                    "record_count": chunk.record_count,
                    "record_range": [span.start, span.end],
                    "download_url": format!(
                        "{}/export/{}/download/batch/{}",
                        base_url, record.id, span.index
                    ),
                }))
            })
            .collect();
        data["total_files"] = json!(spans.len());
        data["individual_files"] = json!(individual_files);

        if let (Ok(archive), Some(stats)) = (
            record.artifact_for(DownloadVariant::Archive),
            record.archive_stats(),
        ) {
            data["archive"] = json!({
                "filename": archive.suggested_filename,
                "compressed_size": stats.compressed_total,
                "uncompressed_size": stats.uncompressed_total,
                "compression_ratio": stats.compression_ratio,
                "download_url": format!("{}/export/{}/download/zip", base_url, record.id),
            });
        }
    }

    data
}
