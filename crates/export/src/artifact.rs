//! Artifacts and export records.
//!
//! An [`Artifact`] is one downloadable file held in memory: its bytes,
//! MIME type, suggested filename, and record count. An [`ExportRecord`]
//! is the immutable registry entry describing one completed export job,
//! its artifacts, and its processing metrics. Records never mutate after
//! creation; destruction is registry-internal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ExportError, ExportResult};
use crate::planner::{ChunkSpan, Strategy};
use crate::templates::ExportType;

/// One downloadable file held as an in-memory byte buffer.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// The file bytes.
    pub bytes: Vec<u8>,
    /// MIME type served on download.
    pub mime_type: &'static str,
    /// Sanitized filename suggested in `Content-Disposition`.
    pub suggested_filename: String,
    /// Byte length before any archive compression.
    pub uncompressed_size: u64,
    /// Data rows contained (headers excluded).
    pub record_count: u64,
}

impl Artifact {
    /// Byte length of the buffer.
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Returns true when the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Compression accounting for a produced archive.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArchiveStats {
    /// Sum of entry sizes before compression.
    pub uncompressed_total: u64,
    /// Archive byte length.
    pub compressed_total: u64,
    /// `compressed / uncompressed`; lower is better.
    pub compression_ratio: f64,
}

/// The artifacts attached to a record, by strategy.
#[derive(Debug)]
pub enum ExportArtifacts {
    /// Single-strategy: one workbook.
    Single(Artifact),
    /// Multi-strategy: ordered chunks plus their archive.
    Multi {
        /// Chunk workbooks in batch order.
        chunks: Vec<Artifact>,
        /// Record spans, parallel to `chunks`.
        spans: Vec<ChunkSpan>,
        /// The compressed bundle of all chunks.
        archive: Artifact,
        /// Compression accounting.
        stats: ArchiveStats,
    },
}

/// Timing and throughput measurements for one export job.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingMetrics {
    /// Wall-clock elapsed, floored at 1 ms.
    pub elapsed_ms: u64,
    /// Resident-size delta in MiB, absent when sampling is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_rss_mb: Option<u64>,
    /// Output bytes per record.
    pub bytes_per_record: f64,
    /// Records emitted per second.
    pub records_per_second: f64,
    /// Per-chunk elapsed breakdown (multi only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chunk_elapsed_ms: Vec<u64>,
}

/// Which artifact a download request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadVariant {
    /// The natural artifact: the single workbook, or the archive.
    Default,
    /// Explicitly the single workbook.
    Single,
    /// Explicitly the archive.
    Archive,
    /// The n-th chunk (1-based).
    Batch(u64),
}

/// An immutable registry entry for one completed export.
#[derive(Debug)]
pub struct ExportRecord {
    /// Opaque, URL-safe identifier.
    pub id: String,
    /// Registry insertion sequence; breaks `created_at` ties.
    pub seq: u64,
    /// The chosen strategy.
    pub strategy: Strategy,
    /// The artifacts, by strategy.
    pub artifacts: ExportArtifacts,
    /// The export type served.
    pub export_type: ExportType,
    /// The template used.
    pub template_name: String,
    /// Total records exported.
    pub record_count: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp; always strictly after `created_at`.
    pub expires_at: DateTime<Utc>,
    /// Processing measurements.
    pub metrics: ProcessingMetrics,
}

impl ExportRecord {
    /// True once the retention window has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Sum of all artifact byte lengths held by this record.
    pub fn total_bytes(&self) -> u64 {
        match &self.artifacts {
            ExportArtifacts::Single(artifact) => artifact.len(),
            ExportArtifacts::Multi { chunks, archive, .. } => {
                chunks.iter().map(Artifact::len).sum::<u64>() + archive.len()
            }
        }
    }

    /// The artifact a download request should serve.
    pub fn artifact_for(&self, variant: DownloadVariant) -> ExportResult<&Artifact> {
        match (&self.artifacts, variant) {
            (ExportArtifacts::Single(artifact), DownloadVariant::Default)
            | (ExportArtifacts::Single(artifact), DownloadVariant::Single) => Ok(artifact),
            (ExportArtifacts::Single(_), DownloadVariant::Archive) => {
                Err(ExportError::VariantMismatch(format!(
                    "export '{}' is a single file; no archive exists",
                    self.id
                )))
            }
            (ExportArtifacts::Single(_), DownloadVariant::Batch(_)) => {
                Err(ExportError::VariantMismatch(format!(
                    "export '{}' is a single file; no batches exist",
                    self.id
                )))
            }
            (ExportArtifacts::Multi { archive, .. }, DownloadVariant::Default)
            | (ExportArtifacts::Multi { archive, .. }, DownloadVariant::Archive) => Ok(archive),
            (ExportArtifacts::Multi { .. }, DownloadVariant::Single) => {
                Err(ExportError::VariantMismatch(format!(
                    "export '{}' was chunked into multiple files; request the archive or a batch",
                    self.id
                )))
            }
            (ExportArtifacts::Multi { chunks, .. }, DownloadVariant::Batch(n)) => {
                if n == 0 || n as usize > chunks.len() {
                    Err(ExportError::NotFound(format!(
                        "export '{}' has {} batches; batch {} does not exist",
                        self.id,
                        chunks.len(),
                        n
                    )))
                } else {
                    Ok(&chunks[(n - 1) as usize])
                }
            }
        }
    }

    /// Chunk spans for a multi record; empty for single.
    pub fn chunk_spans(&self) -> &[ChunkSpan] {
        match &self.artifacts {
            ExportArtifacts::Single(_) => &[],
            ExportArtifacts::Multi { spans, .. } => spans,
        }
    }

    /// Archive compression stats for a multi record.
    pub fn archive_stats(&self) -> Option<ArchiveStats> {
        match &self.artifacts {
            ExportArtifacts::Single(_) => None,
            ExportArtifacts::Multi { stats, .. } => Some(*stats),
        }
    }
}
