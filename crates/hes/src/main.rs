//! Helios Export Service (HES)
//!
//! HTTP server that materializes tabular datasets into downloadable
//! spreadsheet artifacts.

use std::sync::Arc;

use clap::Parser;
use helios_export::{ExportCoordinator, ExportRegistry, InMemorySource};
use helios_export_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::info;

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let engine = config.engine_config();
    info!(
        port = config.port,
        host = %config.host,
        retention_hours = config.export_retention_hours,
        keep_last_n = engine.keep_last_n,
        "Starting Helios Export Service"
    );

    let registry = Arc::new(ExportRegistry::new(engine.retention_policy()));

    if engine.cleanup_on_startup {
        let outcome = registry.sweep(chrono::Utc::now());
        info!(removed = outcome.removed(), "startup sweep complete");
    }

    // The periodic sweeper enforces retention between requests.
    let sweeper = ExportRegistry::spawn_sweeper(Arc::clone(&registry), engine.sweep_interval);

    // Inline-data deployments run without a database adapter; requests
    // that carry filters are answered with source_unavailable.
    let coordinator = Arc::new(ExportCoordinator::<InMemorySource>::new(
        Arc::clone(&registry),
        None,
        engine,
    ));

    let app = create_app_with_config(coordinator, config.clone());
    let result = serve(app, &config).await;

    sweeper.abort();
    result
}
