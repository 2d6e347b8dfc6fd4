//! Server configuration for the export HTTP API.
//!
//! This module provides configuration types for the export server,
//! supporting both programmatic configuration and environment variable
//! overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HES_SERVER_PORT` | 8080 | Server port |
//! | `HES_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `HES_LOG_LEVEL` | info | Log level |
//! | `HES_BASE_URL` | http://localhost:8080 | Base URL used in download links |
//! | `HES_ENABLE_CORS` | true | Enable CORS |
//! | `HES_CORS_ORIGINS` | * | Allowed origins |
//! | `HES_CORS_METHODS` | GET,POST,OPTIONS | Allowed methods |
//! | `HES_CORS_HEADERS` | Content-Type,Accept,X-Request-ID | Allowed headers |
//! | `MAX_CHUNK_SIZE` | 5000 | Default chunk size when a template is silent |
//! | `MAX_MEMORY_MB` | unset | Soft cap; sizes the large-export gate |
//! | `REQUEST_TIMEOUT` | 300 | Per-job deadline (seconds) |
//! | `EXPORT_RETENTION_HOURS` | 168 | TTL for export records |
//! | `CLEANUP_KEEP_N` | 5 | Keep-last-N retention count |
//! | `CLEANUP_ON_STARTUP` | false | Run one sweep before serving |
//! | `CLEANUP_ON_EXPORT` | false | Sweep at the start of every job |
//! | `CLEANUP_INTERVAL_MINUTES` | 30 | Background sweep interval |
//! | `STORAGE_WARNING_MB` | 256 | Pressure eviction floor |
//! | `STORAGE_CLEANUP_MB` | 512 | Pressure eviction trigger |
//!
//! # Example
//!
//! ```rust
//! use helios_export_rest::ServerConfig;
//!
//! // Create from environment
//! let config = ServerConfig::from_env();
//!
//! // Or create programmatically
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     ..Default::default()
//! };
//! ```

use std::time::Duration;

use clap::Parser;
use helios_export::EngineConfig;

/// Server configuration for the export HTTP API.
///
/// This struct can be constructed from environment variables using
/// [`ServerConfig::from_env`], from command line arguments using
/// [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "export-server")]
#[command(about = "Helios Export Service HTTP API")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "HES_SERVER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "HES_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "HES_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Base URL used when building download links.
    #[arg(long, env = "HES_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Enable CORS.
    #[arg(long, env = "HES_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "HES_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(long, env = "HES_CORS_METHODS", default_value = "GET,POST,OPTIONS")]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "HES_CORS_HEADERS",
        default_value = "Content-Type,Accept,X-Request-ID"
    )]
    pub cors_headers: String,

    /// Default chunk size when a template does not declare one.
    #[arg(long, env = "MAX_CHUNK_SIZE", default_value = "5000")]
    pub max_chunk_size: u64,

    /// Soft memory cap in MiB; sizes the concurrent-large-exports gate.
    #[arg(long, env = "MAX_MEMORY_MB")]
    pub max_memory_mb: Option<u64>,

    /// Per-job deadline in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "300")]
    pub request_timeout: u64,

    /// Retention window for export records, in hours.
    #[arg(long, env = "EXPORT_RETENTION_HOURS", default_value = "168")]
    pub export_retention_hours: u64,

    /// Number of most-recent exports always retained.
    #[arg(long, env = "CLEANUP_KEEP_N", default_value = "5")]
    pub cleanup_keep_n: usize,

    /// Run one sweep before accepting requests.
    #[arg(long, env = "CLEANUP_ON_STARTUP", default_value = "false")]
    pub cleanup_on_startup: bool,

    /// Run a sweep at the start of every export job.
    #[arg(long, env = "CLEANUP_ON_EXPORT", default_value = "false")]
    pub cleanup_on_export: bool,

    /// Minutes between background sweeps.
    #[arg(long, env = "CLEANUP_INTERVAL_MINUTES", default_value = "30")]
    pub cleanup_interval_minutes: u64,

    /// Storage-pressure eviction floor, in MiB.
    #[arg(long, env = "STORAGE_WARNING_MB", default_value = "256")]
    pub storage_warning_mb: u64,

    /// Storage-pressure eviction trigger, in MiB.
    #[arg(long, env = "STORAGE_CLEANUP_MB", default_value = "512")]
    pub storage_cleanup_mb: u64,

    /// Gate on all in-flight export jobs.
    #[arg(long, env = "HES_MAX_CONCURRENT_EXPORTS", default_value = "20")]
    pub max_concurrent_exports: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            base_url: "http://localhost:8080".to_string(),
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,OPTIONS".to_string(),
            cors_headers: "Content-Type,Accept,X-Request-ID".to_string(),
            max_chunk_size: 5_000,
            max_memory_mb: None,
            request_timeout: 300,
            export_retention_hours: 168,
            cleanup_keep_n: 5,
            cleanup_on_startup: false,
            cleanup_on_export: false,
            cleanup_interval_minutes: 30,
            storage_warning_mb: 256,
            storage_cleanup_mb: 512,
            max_concurrent_exports: 20,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables
    /// without requiring command line arguments.
    pub fn from_env() -> Self {
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Derives the engine configuration from the server surface.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_chunk_size: self.max_chunk_size.max(1),
            retention_window: Duration::from_secs(self.export_retention_hours * 3600),
            keep_last_n: self.cleanup_keep_n,
            cleanup_on_startup: self.cleanup_on_startup,
            cleanup_on_export: self.cleanup_on_export,
            storage_warning_bytes: self.storage_warning_mb * 1024 * 1024,
            storage_cleanup_bytes: self.storage_cleanup_mb * 1024 * 1024,
            job_deadline: Duration::from_secs(self.request_timeout.max(1)),
            max_concurrent_exports: self.max_concurrent_exports,
            max_concurrent_large_exports: self.large_export_permits(),
            sweep_interval: Duration::from_secs(self.cleanup_interval_minutes.max(1) * 60),
        }
    }

    /// Number of concurrently running multi-file jobs.
    ///
    /// When a soft memory cap is set, one permit is granted per 512 MiB,
    /// bounded to [1, 8].
    fn large_export_permits(&self) -> usize {
        match self.max_memory_mb {
            Some(mb) => ((mb / 512) as usize).clamp(1, 8),
            None => 3,
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.export_retention_hours == 0 {
            errors.push("Export retention cannot be 0 hours".to_string());
        }

        if self.storage_warning_mb > self.storage_cleanup_mb {
            errors.push("Storage warning threshold cannot exceed the cleanup threshold".to_string());
        }

        if self.max_concurrent_exports == 0 {
            errors.push("Max concurrent exports cannot be 0".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// Uses ephemeral port 0 and disables features that might interfere
    /// with tests.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            log_level: "debug".to_string(),
            enable_cors: false,
            request_timeout: 30,
            export_retention_hours: 1,
            ..Default::default()
        }
    }
}
