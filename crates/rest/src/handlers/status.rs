//! Export status handler.
//!
//! `GET /export/{id}/status` returns the stored metadata of a completed
//! export without touching its artifact bytes.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use helios_export::{ExportError, SourceAdapter};
use tracing::debug;

use crate::error::{RestError, RestResult};
use crate::handlers::export::export_data;
use crate::middleware::request_id::RequestId;
use crate::responses::success;
use crate::state::AppState;

/// Handler for the status interaction.
///
/// # HTTP Request
///
/// `GET /export/{id}/status`
///
/// # Response
///
/// - `200 OK` - Record metadata
/// - `404 Not Found` - Unknown id, or record expired
pub async fn export_status_handler<A>(
    State(state): State<AppState<A>>,
    Path(id): Path<String>,
    request_id: RequestId,
) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    debug!(id = %id, "Processing status request");

    let record = state.registry().lookup_and_pin(&id).ok_or_else(|| {
        RestError::new(
            ExportError::NotFound(format!("export '{}' not found", id)),
            &request_id,
        )
    })?;

    if record.is_expired(Utc::now()) {
        return Err(RestError::new(
            ExportError::Expired(record.id.clone()),
            &request_id,
        ));
    }

    let data = export_data(&record, state.base_url());
    Ok(success(data, Some(&record.metrics)).into_response())
}
