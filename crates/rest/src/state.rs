//! Application state for the export HTTP API.
//!
//! This module defines the shared application state available to all
//! request handlers: the export coordinator, the registry it registers
//! into, and the server configuration.

use std::sync::Arc;
use std::time::Instant;

use helios_export::{ExportCoordinator, ExportRegistry, SourceAdapter};

use crate::config::ServerConfig;

/// Shared application state for the export API.
///
/// # Type Parameters
///
/// * `A` - The source adapter type (must implement [`SourceAdapter`])
pub struct AppState<A> {
    /// The export coordinator.
    coordinator: Arc<ExportCoordinator<A>>,

    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Process start, for uptime reporting.
    started_at: Instant,
}

// Manually implement Clone since the adapter sits behind Arcs and does
// not need to be Clone itself.
impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
            config: Arc::clone(&self.config),
            started_at: self.started_at,
        }
    }
}

impl<A: SourceAdapter> AppState<A> {
    /// Creates a new AppState around a coordinator and configuration.
    pub fn new(coordinator: Arc<ExportCoordinator<A>>, config: ServerConfig) -> Self {
        Self {
            coordinator,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    /// Returns the export coordinator.
    pub fn coordinator(&self) -> &ExportCoordinator<A> {
        &self.coordinator
    }

    /// Returns the export registry.
    pub fn registry(&self) -> &Arc<ExportRegistry> {
        self.coordinator.registry()
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the base URL used in download links.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Seconds since the state was created.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
