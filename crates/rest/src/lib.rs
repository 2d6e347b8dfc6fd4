//! # helios-export-rest - Export Service HTTP API
//!
//! This crate provides the HTTP surface of the Helios Export Service.
//! It wires the export engine ([`helios_export`]) to an Axum router:
//! export creation, status, downloads by variant, template listing,
//! manual cleanup, and storage reporting.
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | create | POST | `/export/{type}` |
//! | status | GET | `/export/{id}/status` |
//! | download | GET | `/export/{id}/download?type=single\|zip` |
//! | download batch | GET | `/export/{id}/download/batch/{n}` |
//! | download archive | GET | `/export/{id}/download/zip` |
//! | templates | GET | `/templates/{type}` |
//! | health | GET | `/health` |
//! | cleanup | POST | `/cleanup`, `/cleanup/force` |
//! | storage | GET | `/storage/info` |
//!
//! ## Envelopes
//!
//! Responses are JSON unless the body IS the artifact:
//!
//! ```json
//! { "status": "success", "data": {...}, "performance_metrics": {...}, "system_info": {...} }
//! { "status": "error", "message": "...", "error_code": "...", "request_id": "..." }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_export::{ExportCoordinator, ExportRegistry, InMemorySource};
//! use helios_export_rest::{create_app_with_config, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env();
//!     let engine = config.engine_config();
//!     let registry = Arc::new(ExportRegistry::new(engine.retention_policy()));
//!     let coordinator = Arc::new(ExportCoordinator::<InMemorySource>::new(
//!         registry, None, engine,
//!     ));
//!
//!     let app = create_app_with_config(coordinator, config.clone());
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`error`] - Engine-error to HTTP mapping and the error envelope
//! - [`config`] - Server configuration
//! - [`state`] - Application state (coordinator, registry, configuration)
//! - [`handlers`] - HTTP request handlers for each interaction
//! - [`middleware`] - Request-id correlation
//! - [`responses`] - Success envelope construction
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use helios_export::{ExportCoordinator, SourceAdapter};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
///
/// This is a convenience function that creates the app with default
/// settings. For more control, use [`create_app_with_config`].
pub fn create_app<A>(coordinator: Arc<ExportCoordinator<A>>) -> Router
where
    A: SourceAdapter + 'static,
{
    create_app_with_config(coordinator, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// Sets up the complete export API with all handlers and middleware.
pub fn create_app_with_config<A>(
    coordinator: Arc<ExportCoordinator<A>>,
    config: ServerConfig,
) -> Router
where
    A: SourceAdapter + 'static,
{
    info!(
        adapter = coordinator.adapter_name().unwrap_or("none"),
        "Creating export API server"
    );

    // Create application state
    let state = AppState::new(coordinator, config.clone());

    // Build the router with all export routes
    let router = routing::create_routes(state)
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    // Add CORS if enabled
    if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    }
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_export={level},helios_export_rest={level},tower_http=debug",
            level = level
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
