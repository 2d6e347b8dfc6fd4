//! Template listing handler.
//!
//! `GET /templates/{type}` describes the projection templates available
//! for an export type.

use axum::{
    extract::Path,
    response::{IntoResponse, Response},
};
use helios_export::{ExportError, templates};
use serde_json::json;
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::middleware::request_id::RequestId;
use crate::responses::success;

/// Handler for the template listing.
///
/// # HTTP Request
///
/// `GET /templates/{type}`
///
/// # Response
///
/// - `200 OK` - Template descriptors for the type
/// - `400 Bad Request` - Unknown export type
pub async fn list_templates_handler(
    Path(export_type): Path<String>,
    request_id: RequestId,
) -> RestResult<Response> {
    debug!(export_type = %export_type, "Processing template listing");

    let export_type: helios_export::ExportType = export_type
        .parse()
        .map_err(|e: String| RestError::new(ExportError::Validation(e), &request_id))?;

    let descriptors: Vec<serde_json::Value> = templates::templates_for(export_type)
        .iter()
        .map(|template| {
            json!({
                "name": template.name,
                "columns": template.headers(),
                "column_count": template.columns.len(),
                "max_records_single_file": template.max_records_single_file,
                "recommended_chunk_size": template.recommended_chunk_size,
                "includes_sensitive": template.includes_sensitive,
            })
        })
        .collect();

    let data = json!({
        "export_type": export_type,
        "templates": descriptors,
    });
    Ok(success(data, None).into_response())
}
