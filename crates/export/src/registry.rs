//! The export registry.
//!
//! An in-memory map from export id to [`ExportRecord`] with three
//! eviction forces, applied in order on every insertion and on every
//! sweep:
//!
//! 1. TTL: entries past `expires_at` are removed.
//! 2. Keep-last-N: after TTL eviction, oldest entries are removed until
//!    at most N remain, so the N most recent successful exports are
//!    always present.
//! 3. Storage pressure: when total artifact bytes exceed the cleanup
//!    threshold, oldest entries are evicted until the total falls below
//!    the warning threshold.
//!
//! The registry is the only shared mutable state in the engine. Its lock
//! is held only across map operations, never across I/O. Readers pin an
//! entry by cloning its `Arc`: eviction drops the map entry immediately,
//! and the byte buffers are reclaimed when the last pinned reader
//! releases its handle.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::ExportRecord;

/// Retention and storage-pressure configuration.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Duration between creation and expiry.
    pub retention_window: Duration,
    /// Number of most-recent exports always retained.
    pub keep_last_n: usize,
    /// Pressure eviction stops once total bytes fall below this.
    pub storage_warning_bytes: u64,
    /// Pressure eviction starts once total bytes exceed this.
    pub storage_cleanup_bytes: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_window: Duration::from_secs(7 * 24 * 3600),
            keep_last_n: 5,
            storage_warning_bytes: 256 * 1024 * 1024,
            storage_cleanup_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Counts of entries removed by one sweep.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SweepOutcome {
    /// Entries removed because their TTL passed.
    pub expired: usize,
    /// Entries removed by keep-last-N trimming.
    pub retention_evicted: usize,
    /// Entries removed by storage-pressure eviction.
    pub pressure_evicted: usize,
    /// Entries remaining afterwards.
    pub remaining: usize,
}

impl SweepOutcome {
    /// Total entries removed by the sweep.
    pub fn removed(&self) -> usize {
        self.expired + self.retention_evicted + self.pressure_evicted
    }
}

/// Aggregate registry size, for the storage endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageInfo {
    /// Number of live entries.
    pub entry_count: usize,
    /// Sum of artifact byte lengths across entries.
    pub total_bytes: u64,
    /// Configured warning threshold.
    pub warning_threshold_bytes: u64,
    /// Configured cleanup threshold.
    pub cleanup_threshold_bytes: u64,
}

/// In-memory registry of completed exports.
pub struct ExportRegistry {
    records: RwLock<HashMap<String, Arc<ExportRecord>>>,
    policy: RetentionPolicy,
    seq: AtomicU64,
}

impl ExportRegistry {
    /// Creates an empty registry under `policy`.
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            policy,
            seq: AtomicU64::new(0),
        }
    }

    /// The retention policy in force.
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Allocates the next insertion sequence number.
    pub fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Inserts a completed record, then applies the eviction forces.
    ///
    /// Returns the pinned record. After return, the N most recent
    /// successful exports (including this one) are present.
    pub fn insert(&self, record: ExportRecord) -> Arc<ExportRecord> {
        let record = Arc::new(record);
        let now = Utc::now();
        let mut map = self.records.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert(record.id.clone(), Arc::clone(&record));
        let outcome = Self::apply_evictions(&mut map, &self.policy, now);
        if outcome.removed() > 0 {
            debug!(
                expired = outcome.expired,
                retention = outcome.retention_evicted,
                pressure = outcome.pressure_evicted,
                remaining = outcome.remaining,
                "registry eviction after insert"
            );
        }
        record
    }

    /// Looks up a record and pins it for reading.
    ///
    /// Expiry is not checked here; callers decide how to surface an
    /// expired-but-not-yet-swept record.
    pub fn lookup_and_pin(&self, id: &str) -> Option<Arc<ExportRecord>> {
        let map = self.records.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.get(id).cloned()
    }

    /// Runs one sweep at `now`, applying all three eviction forces.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepOutcome {
        let mut map = self.records.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let outcome = Self::apply_evictions(&mut map, &self.policy, now);
        if outcome.removed() > 0 {
            info!(
                expired = outcome.expired,
                retention = outcome.retention_evicted,
                pressure = outcome.pressure_evicted,
                remaining = outcome.remaining,
                "registry sweep"
            );
        }
        outcome
    }

    /// Administrative purge: removes every entry regardless of retention.
    pub fn purge(&self) -> usize {
        let mut map = self.records.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let removed = map.len();
        map.clear();
        if removed > 0 {
            info!(removed, "registry purged");
        }
        removed
    }

    /// Aggregate size information.
    pub fn storage_info(&self) -> StorageInfo {
        let map = self.records.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        StorageInfo {
            entry_count: map.len(),
            total_bytes: map.values().map(|r| r.total_bytes()).sum(),
            warning_threshold_bytes: self.policy.storage_warning_bytes,
            cleanup_threshold_bytes: self.policy.storage_cleanup_bytes,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// Returns true when the registry holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply_evictions(
        map: &mut HashMap<String, Arc<ExportRecord>>,
        policy: &RetentionPolicy,
        now: DateTime<Utc>,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        // 1. TTL eviction.
        let expired: Vec<String> = map
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.id.clone())
            .collect();
        for id in &expired {
            map.remove(id);
        }
        outcome.expired = expired.len();

        // 2. Keep-last-N retention, oldest first.
        if map.len() > policy.keep_last_n {
            let excess = map.len() - policy.keep_last_n;
            for id in Self::oldest_ids(map, excess) {
                map.remove(&id);
                outcome.retention_evicted += 1;
            }
        }

        // 3. Storage-pressure eviction down to the warning threshold.
        let mut total: u64 = map.values().map(|r| r.total_bytes()).sum();
        if total > policy.storage_cleanup_bytes {
            for id in Self::oldest_ids(map, map.len()) {
                if total <= policy.storage_warning_bytes {
                    break;
                }
                if let Some(record) = map.remove(&id) {
                    total = total.saturating_sub(record.total_bytes());
                    outcome.pressure_evicted += 1;
                }
            }
        }

        outcome.remaining = map.len();
        outcome
    }

    /// Spawns the periodic background sweeper.
    ///
    /// The task runs [`ExportRegistry::sweep`] every `interval` until the
    /// returned handle is aborted; the lock discipline makes any tick a
    /// safe interruption point.
    pub fn spawn_sweeper(
        registry: Arc<ExportRegistry>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep(Utc::now());
            }
        })
    }

    /// Ids of up to `count` oldest entries, by creation order.
    fn oldest_ids(map: &HashMap<String, Arc<ExportRecord>>, count: usize) -> Vec<String> {
        let mut entries: Vec<(&String, &Arc<ExportRecord>)> = map.iter().collect();
        entries.sort_by_key(|(_, r)| (r.created_at, r.seq));
        entries
            .into_iter()
            .take(count)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, ExportArtifacts, ProcessingMetrics};
    use crate::planner::Strategy;
    use crate::templates::ExportType;
    use chrono::Duration as ChronoDuration;

    fn record(id: &str, seq: u64, bytes: usize, window: Duration) -> ExportRecord {
        let created = Utc::now() + ChronoDuration::milliseconds(seq as i64);
        ExportRecord {
            id: id.to_string(),
            seq,
            strategy: Strategy::Single,
            artifacts: ExportArtifacts::Single(Artifact {
                bytes: vec![0x50; bytes],
                mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                suggested_filename: format!("{}.xlsx", id),
                uncompressed_size: bytes as u64,
                record_count: 1,
            }),
            export_type: ExportType::Participants,
            template_name: "standard".into(),
            record_count: 1,
            created_at: created,
            expires_at: created + ChronoDuration::from_std(window).unwrap(),
            metrics: ProcessingMetrics {
                elapsed_ms: 1,
                peak_rss_mb: None,
                bytes_per_record: bytes as f64,
                records_per_second: 1.0,
                chunk_elapsed_ms: Vec::new(),
            },
        }
    }

    fn policy(keep: usize) -> RetentionPolicy {
        RetentionPolicy {
            retention_window: Duration::from_secs(3600),
            keep_last_n: keep,
            storage_warning_bytes: u64::MAX,
            storage_cleanup_bytes: u64::MAX,
        }
    }

    #[test]
    fn keep_last_n_retains_most_recent() {
        let registry = ExportRegistry::new(policy(3));
        for (i, id) in ["e1", "e2", "e3", "e4"].iter().enumerate() {
            registry.insert(record(id, i as u64 + 1, 200, Duration::from_secs(3600)));
        }
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup_and_pin("e1").is_none());
        for id in ["e2", "e3", "e4"] {
            assert!(registry.lookup_and_pin(id).is_some(), "{} missing", id);
        }
    }

    #[test]
    fn ttl_eviction_removes_expired() {
        let registry = ExportRegistry::new(policy(10));
        registry.insert(record("fresh", 1, 200, Duration::from_secs(3600)));
        registry.insert(record("stale", 2, 200, Duration::from_millis(100)));
        let outcome = registry.sweep(Utc::now() + ChronoDuration::seconds(1));
        assert_eq!(outcome.expired, 1);
        assert!(registry.lookup_and_pin("stale").is_none());
        assert!(registry.lookup_and_pin("fresh").is_some());
    }

    #[test]
    fn storage_pressure_evicts_oldest_until_warning() {
        let policy = RetentionPolicy {
            retention_window: Duration::from_secs(3600),
            keep_last_n: 100,
            storage_warning_bytes: 1_000,
            storage_cleanup_bytes: 2_000,
        };
        let registry = ExportRegistry::new(policy);
        registry.insert(record("old", 1, 900, Duration::from_secs(3600)));
        registry.insert(record("mid", 2, 900, Duration::from_secs(3600)));
        // Third insert pushes the total past the cleanup threshold.
        registry.insert(record("new", 3, 900, Duration::from_secs(3600)));
        let info = registry.storage_info();
        assert!(info.total_bytes <= 1_000, "total {} above warning", info.total_bytes);
        assert!(registry.lookup_and_pin("new").is_some());
        assert!(registry.lookup_and_pin("old").is_none());
    }

    #[test]
    fn pinned_reader_survives_eviction() {
        let registry = ExportRegistry::new(policy(1));
        registry.insert(record("a", 1, 200, Duration::from_secs(3600)));
        let pinned = registry.lookup_and_pin("a").unwrap();
        registry.insert(record("b", 2, 200, Duration::from_secs(3600)));
        // "a" was evicted by keep-last-1 but the pinned handle still reads.
        assert!(registry.lookup_and_pin("a").is_none());
        assert_eq!(pinned.record_count, 1);
        assert_eq!(pinned.total_bytes(), 200);
    }

    #[test]
    fn purge_clears_everything() {
        let registry = ExportRegistry::new(policy(10));
        registry.insert(record("a", 1, 200, Duration::from_secs(3600)));
        registry.insert(record("b", 2, 200, Duration::from_secs(3600)));
        assert_eq!(registry.purge(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn sweep_outcome_counts_remaining() {
        let registry = ExportRegistry::new(policy(10));
        registry.insert(record("a", 1, 200, Duration::from_secs(3600)));
        let outcome = registry.sweep(Utc::now());
        assert_eq!(outcome.removed(), 0);
        assert_eq!(outcome.remaining, 1);
    }
}
