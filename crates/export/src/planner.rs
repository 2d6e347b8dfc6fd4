//! Export strategy planning.
//!
//! Decides single-file versus chunked multi-file output from the resolved
//! record count, the template's single-file ceiling, and caller
//! overrides, then computes the chunk spans. When the count equals the
//! ceiling exactly the export stays single; forced chunking on a small
//! dataset degenerates to one chunk plus an archive.

use serde::Serialize;

use crate::templates::{GLOBAL_SINGLE_FILE_CAP, Template};

/// Whether an export produces one artifact or chunks plus an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One workbook artifact.
    Single,
    /// Multiple chunk workbooks bundled into an archive.
    Multi,
}

/// A 1-indexed contiguous record range covered by one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkSpan {
    /// 1-based batch number.
    pub index: u64,
    /// 1-based first record of the chunk.
    pub start: u64,
    /// 1-based last record of the chunk (inclusive).
    pub end: u64,
}

impl ChunkSpan {
    /// Number of records in this chunk.
    pub fn count(&self) -> u64 {
        (self.end + 1).saturating_sub(self.start)
    }

    /// Zero-based offset of the first record.
    pub fn offset(&self) -> u64 {
        self.start - 1
    }
}

/// The planner's decision for one export job.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// The chosen strategy.
    pub strategy: Strategy,
    /// Effective chunk size (meaningful for multi).
    pub chunk_size: u64,
    /// Chunk spans partitioning `[1, record_count]`; empty for single.
    pub chunks: Vec<ChunkSpan>,
    /// The resolved record count.
    pub record_count: u64,
}

impl ExportPlan {
    /// Total number of chunk files (0 for single).
    pub fn total_chunks(&self) -> u64 {
        self.chunks.len() as u64
    }
}

/// Plans the strategy for `record_count` records under `template`.
///
/// `fallback_chunk_size` applies only when the template declares no
/// chunk size of its own and the caller gave no override.
pub fn plan(
    record_count: u64,
    template: &Template,
    chunk_size_override: Option<u64>,
    force_chunking: bool,
    fallback_chunk_size: u64,
) -> ExportPlan {
    let multi = force_chunking
        || record_count > template.max_records_single_file
        || record_count > GLOBAL_SINGLE_FILE_CAP;

    if !multi {
        return ExportPlan {
            strategy: Strategy::Single,
            chunk_size: record_count,
            chunks: Vec::new(),
            record_count,
        };
    }

    let template_default = if template.recommended_chunk_size > 0 {
        template.recommended_chunk_size
    } else {
        fallback_chunk_size
    };
    let chunk_size = chunk_size_override.unwrap_or(template_default).max(1);
    let mut chunks = Vec::new();
    let mut start = 1u64;
    let mut index = 1u64;
    while start <= record_count {
        let end = (start + chunk_size - 1).min(record_count);
        chunks.push(ChunkSpan { index, start, end });
        start = end + 1;
        index += 1;
    }
    // Forced chunking on an empty set still produces one (empty) chunk so
    // the archive exists.
    if chunks.is_empty() {
        chunks.push(ChunkSpan {
            index: 1,
            start: 1,
            end: 0,
        });
    }

    ExportPlan {
        strategy: Strategy::Multi,
        chunk_size,
        chunks,
        record_count,
    }
}
