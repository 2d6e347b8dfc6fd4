//! Storage info handler.
//!
//! `GET /storage/info` reports aggregate registry size and the
//! configured pressure thresholds.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use helios_export::SourceAdapter;
use serde_json::json;
use tracing::debug;

use crate::error::RestResult;
use crate::responses::success;
use crate::state::AppState;

/// Handler for the storage info endpoint.
///
/// # HTTP Request
///
/// `GET /storage/info`
pub async fn storage_info_handler<A>(State(state): State<AppState<A>>) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    debug!("Processing storage info request");

    let info = state.registry().storage_info();
    let data = json!({
        "entry_count": info.entry_count,
        "total_bytes": info.total_bytes,
        "warning_threshold_bytes": info.warning_threshold_bytes,
        "cleanup_threshold_bytes": info.cleanup_threshold_bytes,
    });
    Ok(success(data, None).into_response())
}
