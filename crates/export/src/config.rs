//! Engine configuration.
//!
//! The knobs the coordinator and registry run under. The HTTP layer
//! builds this from its own configuration surface; defaults here match
//! the documented environment defaults.

use std::time::Duration;

use crate::registry::RetentionPolicy;

/// Configuration for the export engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Chunk size used when a template is silent and no override is given.
    pub default_chunk_size: u64,
    /// Duration between a record's creation and its expiry.
    pub retention_window: Duration,
    /// Number of most-recent exports always retained.
    pub keep_last_n: usize,
    /// Run one sweep before accepting requests.
    pub cleanup_on_startup: bool,
    /// Run a sweep at the start of every export job.
    pub cleanup_on_export: bool,
    /// Storage-pressure eviction stops below this total.
    pub storage_warning_bytes: u64,
    /// Storage-pressure eviction starts above this total.
    pub storage_cleanup_bytes: u64,
    /// Per-job wall-clock deadline.
    pub job_deadline: Duration,
    /// Gate on all in-flight jobs.
    pub max_concurrent_exports: usize,
    /// Gate on in-flight multi-file jobs, bounding peak memory.
    pub max_concurrent_large_exports: usize,
    /// Interval between background sweeps.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: 5_000,
            retention_window: Duration::from_secs(7 * 24 * 3600),
            keep_last_n: 5,
            cleanup_on_startup: false,
            cleanup_on_export: false,
            storage_warning_bytes: 256 * 1024 * 1024,
            storage_cleanup_bytes: 512 * 1024 * 1024,
            job_deadline: Duration::from_secs(300),
            max_concurrent_exports: 20,
            max_concurrent_large_exports: 3,
            sweep_interval: Duration::from_secs(30 * 60),
        }
    }
}

impl EngineConfig {
    /// The retention policy slice of this configuration.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            retention_window: self.retention_window,
            keep_last_n: self.keep_last_n,
            storage_warning_bytes: self.storage_warning_bytes,
            storage_cleanup_bytes: self.storage_cleanup_bytes,
        }
    }

    /// A configuration suitable for tests: tiny deadlines kept off, fast
    /// sweeps, generous gates.
    pub fn for_testing() -> Self {
        Self {
            retention_window: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(1),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.keep_last_n, 5);
        assert_eq!(config.max_concurrent_exports, 20);
        assert_eq!(config.max_concurrent_large_exports, 3);
        assert_eq!(config.retention_window, Duration::from_secs(7 * 24 * 3600));
        assert_eq!(config.sweep_interval, Duration::from_secs(1800));
    }

    #[test]
    fn retention_policy_mirrors_config() {
        let config = EngineConfig::default();
        let policy = config.retention_policy();
        assert_eq!(policy.keep_last_n, config.keep_last_n);
        assert_eq!(policy.retention_window, config.retention_window);
    }
}
