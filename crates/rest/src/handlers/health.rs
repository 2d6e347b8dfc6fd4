//! Health check endpoint handlers.
//!
//! Provides the health check endpoint for monitoring and load
//! balancers, reporting version, dependency presence, and registry
//! population, plus the liveness and readiness probes deployments
//! wire to.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_export::SourceAdapter;
use tracing::debug;

use crate::error::RestResult;
use crate::responses::SERVICE_NAME;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// # HTTP Request
///
/// `GET [base]/health`
///
/// # Response
///
/// - `200 OK` - Server is healthy
pub async fn health_handler<A>(State(state): State<AppState<A>>) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    debug!("Processing health check request");

    let health_response = serde_json::json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.uptime_seconds(),
        "checks": {
            "workbook_engine": "umya-spreadsheet",
            "source_adapter": state.coordinator().adapter_name().unwrap_or("none"),
            "registry_entries": state.registry().len(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((StatusCode::OK, Json(health_response)).into_response())
}

/// Handler for a liveness probe.
///
/// # HTTP Request
///
/// `GET [base]/_liveness`
pub async fn liveness_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Handler for a readiness probe.
///
/// Exercises the registry before reporting ready, so a deployment is
/// not routed traffic until the engine's shared state is reachable.
///
/// # HTTP Request
///
/// `GET [base]/_readiness`
pub async fn readiness_handler<A>(State(state): State<AppState<A>>) -> RestResult<Response>
where
    A: SourceAdapter + 'static,
{
    debug!("Processing readiness check request");

    let info = state.registry().storage_info();

    let response = serde_json::json!({
        "status": "ready",
        "checks": {
            "registry": "ok",
            "registry_entries": info.entry_count,
        }
    });

    Ok((StatusCode::OK, Json(response)).into_response())
}
