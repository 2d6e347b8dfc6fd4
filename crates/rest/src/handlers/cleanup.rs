//! Manual cleanup handlers.
//!
//! `POST /cleanup` runs one sweep under the configured retention rules;
//! `POST /cleanup/force` is the administrative purge that ignores the
//! keep-last-N retention and empties the registry.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use helios_export::SourceAdapter;
use serde_json::json;
use tracing::info;

use crate::error::RestResult;
use crate::responses::success;
use crate::state::AppState;

/// Handler for the manual sweep.
///
/// # HTTP Request
///
/// `POST /cleanup`
pub async fn cleanup_handler<A>(State(state): State<AppState<A>>) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    let outcome = state.registry().sweep(Utc::now());
    info!(removed = outcome.removed(), "manual cleanup");

    let data = json!({
        "removed": outcome.removed(),
        "expired": outcome.expired,
        "retention_evicted": outcome.retention_evicted,
        "pressure_evicted": outcome.pressure_evicted,
        "remaining": outcome.remaining,
    });
    Ok(success(data, None).into_response())
}

/// Handler for the administrative purge.
///
/// # HTTP Request
///
/// `POST /cleanup/force`
pub async fn cleanup_force_handler<A>(State(state): State<AppState<A>>) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    let removed = state.registry().purge();
    info!(removed, "forced cleanup");

    let data = json!({
        "removed": removed,
        "remaining": 0,
    });
    Ok(success(data, None).into_response())
}
