//! Route configuration.
//!
//! Defines all routes of the export API:
//!
//! ## Export lifecycle
//! - `POST /export/{type}` - Create an export (the path segment carries
//!   the export type; the route pattern reuses the `{id}` parameter name
//!   required by the sibling routes)
//! - `GET /export/{id}/status` - Record metadata
//! - `GET /export/{id}/download` - Default artifact (`?type=single|zip`)
//! - `GET /export/{id}/download/batch/{n}` - One chunk of a multi record
//! - `GET /export/{id}/download/zip` - The archive of a multi record
//!
//! ## Catalog and operations
//! - `GET /templates/{type}` - Template descriptors
//! - `GET /health` - Liveness and dependency presence
//! - `GET /_liveness`, `GET /_readiness` - Deployment probes
//! - `POST /cleanup` - Manual sweep
//! - `POST /cleanup/force` - Administrative purge
//! - `GET /storage/info` - Aggregate registry size

use axum::{
    Router,
    routing::{get, post},
};
use helios_export::SourceAdapter;

use crate::handlers;
use crate::state::AppState;

/// Creates the full route table bound to `state`.
pub fn create_routes<A>(state: AppState<A>) -> Router
where
    A: SourceAdapter + 'static,
{
    Router::new()
        .route("/export/{id}", post(handlers::export::create_export_handler))
        .route(
            "/export/{id}/status",
            get(handlers::status::export_status_handler),
        )
        .route(
            "/export/{id}/download",
            get(handlers::download::download_handler),
        )
        .route(
            "/export/{id}/download/batch/{n}",
            get(handlers::download::download_batch_handler),
        )
        .route(
            "/export/{id}/download/zip",
            get(handlers::download::download_zip_handler),
        )
        .route(
            "/templates/{id}",
            get(handlers::templates::list_templates_handler),
        )
        .route("/health", get(handlers::health::health_handler))
        .route("/_liveness", get(handlers::health::liveness_handler))
        .route("/_readiness", get(handlers::health::readiness_handler))
        .route("/cleanup", post(handlers::cleanup::cleanup_handler))
        .route(
            "/cleanup/force",
            post(handlers::cleanup::cleanup_force_handler),
        )
        .route("/storage/info", get(handlers::storage::storage_info_handler))
        .with_state(state)
}
