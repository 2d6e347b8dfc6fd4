//! Export orchestration.
//!
//! The coordinator drives one export job end to end: validate the
//! request, run the pre-insertion sweep when configured, resolve the
//! record source, plan the strategy, emit and gate the artifacts, and
//! register the result. Failures surface as the closed error kinds;
//! a failed job registers nothing and leaves no artifact behind.
//!
//! Two semaphores bound concurrency: one over all in-flight jobs and a
//! tighter one over multi-file jobs, which dominate peak memory. A
//! saturated gate returns backpressure rather than queueing. Every job
//! runs under a wall-clock deadline.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::archiver::bundle;
use crate::artifact::{Artifact, ExportArtifacts, ExportRecord, ProcessingMetrics};
use crate::config::EngineConfig;
use crate::error::{ExportError, ExportResult};
use crate::names::{archive_filename, chunk_filename, single_filename};
use crate::planner::{ExportPlan, Strategy, plan};
use crate::projector::project;
use crate::registry::ExportRegistry;
use crate::request::ExportRequest;
use crate::source::{FilterSpec, SourceAdapter};
use crate::templates::{ExportType, Template};
use crate::value::Record;
use crate::writer::write_artifact;

/// Orchestrates export jobs against a registry and an optional source
/// adapter.
pub struct ExportCoordinator<A> {
    registry: Arc<ExportRegistry>,
    adapter: Option<Arc<A>>,
    config: EngineConfig,
    total_jobs: Semaphore,
    large_jobs: Semaphore,
}

impl<A> ExportCoordinator<A>
where
    A: SourceAdapter,
{
    /// Creates a coordinator. Jobs that need a database source fail with
    /// `source_unavailable` when `adapter` is `None`.
    pub fn new(registry: Arc<ExportRegistry>, adapter: Option<Arc<A>>, config: EngineConfig) -> Self {
        let total_jobs = Semaphore::new(config.max_concurrent_exports);
        let large_jobs = Semaphore::new(config.max_concurrent_large_exports);
        Self {
            registry,
            adapter,
            config,
            total_jobs,
            large_jobs,
        }
    }

    /// The registry this coordinator registers into.
    pub fn registry(&self) -> &Arc<ExportRegistry> {
        &self.registry
    }

    /// The engine configuration in force.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Name of the configured source adapter, if any.
    pub fn adapter_name(&self) -> Option<&'static str> {
        self.adapter.as_deref().map(SourceAdapter::name)
    }

    /// Runs one export job to completion under the configured deadline.
    pub async fn run(
        &self,
        export_type: ExportType,
        request: ExportRequest,
    ) -> ExportResult<Arc<ExportRecord>> {
        let _total = self
            .total_jobs
            .try_acquire()
            .map_err(|_| ExportError::Backpressure)?;

        let deadline = self.config.job_deadline;
        match tokio::time::timeout(deadline, self.execute(export_type, request)).await {
            Ok(result) => result,
            Err(_) => Err(ExportError::JobTimeout(deadline.as_secs())),
        }
    }

    async fn execute(
        &self,
        export_type: ExportType,
        request: ExportRequest,
    ) -> ExportResult<Arc<ExportRecord>> {
        let template = request.validate(export_type)?;

        if self.config.cleanup_on_export {
            self.registry.sweep(Utc::now());
        }

        let source = self.resolve_source(&request)?;
        let record_count = source.count().await?;

        let export_plan = plan(
            record_count,
            template,
            request.chunk_size,
            request.force_chunking,
            self.config.default_chunk_size,
        );
        // An override that recreates an oversized single file defeats the
        // point of chunking.
        if export_plan.strategy == Strategy::Multi
            && export_plan.chunk_size > template.max_records_single_file
        {
            return Err(ExportError::TemplateLimitExceeded {
                template: template.name.to_string(),
                limit: template.max_records_single_file,
                requested: export_plan.chunk_size,
            });
        }

        let _large = match export_plan.strategy {
            Strategy::Multi => Some(
                self.large_jobs
                    .try_acquire()
                    .map_err(|_| ExportError::Backpressure)?,
            ),
            Strategy::Single => None,
        };

        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let sheet_label = request
            .sheet_name
            .clone()
            .unwrap_or_else(|| format!("{} {}", export_type.label(), created_at.format("%b %Y")));

        debug!(
            id = %id,
            export_type = %export_type,
            template = template.name,
            strategy = ?export_plan.strategy,
            record_count,
            "starting export job"
        );

        let started = Instant::now();
        let rss_before = sample_rss_mb();

        let (artifacts, chunk_elapsed_ms) = match export_plan.strategy {
            Strategy::Single => {
                let records = source.fetch(0, record_count).await?;
                let filename = single_filename(
                    request.filename.as_deref(),
                    export_type,
                    template.name,
                    &id,
                    created_at,
                    request.format.extension(),
                );
                let artifact = write_artifact(
                    request.format,
                    &sheet_label,
                    project(template, records),
                    filename,
                    record_count,
                )?;
                (ExportArtifacts::Single(artifact), Vec::new())
            }
            Strategy::Multi => {
                self.emit_chunked(&source, template, &request, export_type, &id, created_at, &sheet_label, &export_plan)
                    .await?
            }
        };

        let elapsed_ms = (started.elapsed().as_millis() as u64).max(1);
        let rss_after = sample_rss_mb();
        let total_bytes = match &artifacts {
            ExportArtifacts::Single(a) => a.len(),
            ExportArtifacts::Multi { chunks, archive, .. } => {
                chunks.iter().map(Artifact::len).sum::<u64>() + archive.len()
            }
        };

        let metrics = ProcessingMetrics {
            elapsed_ms,
            peak_rss_mb: match (rss_before, rss_after) {
                (Some(before), Some(after)) => Some(after.saturating_sub(before)),
                _ => None,
            },
            bytes_per_record: if record_count == 0 {
                0.0
            } else {
                total_bytes as f64 / record_count as f64
            },
            records_per_second: record_count as f64 / (elapsed_ms as f64 / 1000.0),
            chunk_elapsed_ms,
        };

        let expires_at = created_at
            + chrono::Duration::from_std(self.config.retention_window)
                .map_err(|e| ExportError::Internal(format!("invalid retention window: {}", e)))?;

        let record = ExportRecord {
            id: id.clone(),
            seq: self.registry.next_seq(),
            strategy: export_plan.strategy,
            artifacts,
            export_type,
            template_name: template.name.to_string(),
            record_count,
            created_at,
            expires_at,
            metrics,
        };

        let record = self.registry.insert(record);
        info!(
            id = %id,
            record_count,
            bytes = record.total_bytes(),
            elapsed_ms = record.metrics.elapsed_ms,
            "export registered"
        );
        Ok(record)
    }

    #[allow(clippy::too_many_arguments)]
    async fn emit_chunked(
        &self,
        source: &RecordSource<'_, A>,
        template: &'static Template,
        request: &ExportRequest,
        export_type: ExportType,
        id: &str,
        created_at: DateTime<Utc>,
        sheet_label: &str,
        export_plan: &ExportPlan,
    ) -> ExportResult<(ExportArtifacts, Vec<u64>)> {
        let total = export_plan.total_chunks();
        let mut chunks = Vec::with_capacity(export_plan.chunks.len());
        let mut timings = Vec::with_capacity(export_plan.chunks.len());

        for span in &export_plan.chunks {
            let chunk_started = Instant::now();
            let records = source.fetch(span.offset(), span.count()).await?;
            let filename = chunk_filename(
                request.filename.as_deref(),
                export_type,
                template.name,
                id,
                span.index,
                total,
                created_at,
                request.format.extension(),
            );
            let artifact = write_artifact(
                request.format,
                sheet_label,
                project(template, records),
                filename,
                span.count(),
            )?;
            timings.push((chunk_started.elapsed().as_millis() as u64).max(1));
            chunks.push(artifact);
        }

        let archive_name = archive_filename(
            request.filename.as_deref(),
            export_type,
            template.name,
            id,
            created_at,
        );
        let (archive, stats) = bundle(&chunks, archive_name)?;

        Ok((
            ExportArtifacts::Multi {
                chunks,
                spans: export_plan.chunks.clone(),
                archive,
                stats,
            },
            timings,
        ))
    }

    fn resolve_source<'a>(&'a self, request: &'a ExportRequest) -> ExportResult<RecordSource<'a, A>> {
        match (&request.data, request.effective_filters()) {
            (Some(rows), _) => Ok(RecordSource::Inline(rows)),
            (None, Some(filters)) => {
                let adapter = self.adapter.as_deref().ok_or_else(|| {
                    ExportError::SourceUnavailable("no source adapter is configured".to_string())
                })?;
                Ok(RecordSource::Adapter { adapter, filters })
            }
            (None, None) => Err(ExportError::validation("no data source provided")),
        }
    }
}

/// A resolved record source: inline rows or an adapter query.
enum RecordSource<'a, A> {
    Inline(&'a [Record]),
    Adapter { adapter: &'a A, filters: FilterSpec },
}

impl<'a, A> RecordSource<'a, A>
where
    A: SourceAdapter,
{
    async fn count(&self) -> ExportResult<u64> {
        match self {
            RecordSource::Inline(rows) => Ok(rows.len() as u64),
            RecordSource::Adapter { adapter, filters } => adapter
                .count(filters)
                .await
                .map_err(|e| ExportError::SourceUnavailable(e.to_string())),
        }
    }

    async fn fetch(&self, offset: u64, limit: u64) -> ExportResult<Vec<Record>> {
        match self {
            RecordSource::Inline(rows) => {
                let start = (offset as usize).min(rows.len());
                let end = (start + limit as usize).min(rows.len());
                Ok(rows[start..end].to_vec())
            }
            RecordSource::Adapter { adapter, filters } => adapter
                .fetch_range(filters, offset, limit)
                .await
                .map_err(|e| ExportError::SourceUnavailable(e.to_string())),
        }
    }
}

/// Samples the process resident size in MiB, when the platform allows.
fn sample_rss_mb() -> Option<u64> {
    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = sysinfo::System::new();
    if !sys.refresh_process(pid) {
        return None;
    }
    sys.process(pid).map(|p| p.memory() / (1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::DownloadVariant;
    use crate::source::InMemorySource;
    use crate::writer::CONTAINER_SIGNATURE;

    fn coordinator(config: EngineConfig) -> ExportCoordinator<InMemorySource> {
        let registry = Arc::new(ExportRegistry::new(config.retention_policy()));
        ExportCoordinator::new(registry, None, config)
    }

    fn coordinator_with_source(
        rows: serde_json::Value,
        config: EngineConfig,
    ) -> ExportCoordinator<InMemorySource> {
        let registry = Arc::new(ExportRegistry::new(config.retention_policy()));
        let source = InMemorySource::new(serde_json::from_value(rows).unwrap());
        ExportCoordinator::new(registry, Some(Arc::new(source)), config)
    }

    fn inline_request(json: serde_json::Value) -> ExportRequest {
        serde_json::from_value(json).unwrap()
    }

    fn participants(count: usize) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = (1..=count)
            .map(|i| {
                serde_json::json!({
                    "id": i,
                    "full_name": format!("Participant {}", i),
                    "email": format!("p{}@example.org", i),
                    "country": "UK",
                    "form_status": (i % 3) as i64,
                    "payment_status": (i % 5) as i64,
                })
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    #[tokio::test]
    async fn small_inline_export_is_single() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let request = inline_request(serde_json::json!({
            "data": [
                {"id": 1, "full_name": "Ada Lovelace", "email": "ada@ex.org", "country": "UK", "form_status": 2, "payment_status": 2},
                {"id": 2, "full_name": "Grace Hopper", "email": "grace@ex.org", "country": "US", "form_status": 1, "payment_status": 0},
                {"id": 3, "full_name": "Linus =SUM(1)", "email": "l@ex.org", "country": "FI", "form_status": 0, "payment_status": 4}
            ],
            "filename": "Test_26-07-2025.xlsx"
        }));

        let record = coordinator.run(ExportType::Participants, request).await.unwrap();
        assert_eq!(record.strategy, Strategy::Single);
        assert_eq!(record.record_count, 3);
        let artifact = record.artifact_for(DownloadVariant::Default).unwrap();
        assert_eq!(artifact.suggested_filename, "Test_26-07-2025.xlsx");
        assert_eq!(&artifact.bytes[..2], &CONTAINER_SIGNATURE);
        assert!(artifact.bytes.len() > 100);
        assert!(record.metrics.elapsed_ms >= 1);
        assert!(record.metrics.records_per_second > 0.0);
        assert!(record.expires_at > record.created_at);
    }

    #[tokio::test]
    async fn empty_inline_export_yields_header_only_single() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let request = inline_request(serde_json::json!({"data": []}));
        let record = coordinator.run(ExportType::Participants, request).await.unwrap();
        assert_eq!(record.strategy, Strategy::Single);
        assert_eq!(record.record_count, 0);
        let artifact = record.artifact_for(DownloadVariant::Single).unwrap();
        assert_eq!(&artifact.bytes[..2], &CONTAINER_SIGNATURE);
    }

    #[tokio::test]
    async fn forced_chunking_produces_chunks_and_archive() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let mut request = inline_request(serde_json::json!({"force_chunking": true, "chunk_size": 4}));
        request.data = Some(serde_json::from_value(participants(10)).unwrap());

        let record = coordinator.run(ExportType::Participants, request).await.unwrap();
        assert_eq!(record.strategy, Strategy::Multi);
        assert_eq!(record.chunk_spans().len(), 3);
        let counts: Vec<u64> = record.chunk_spans().iter().map(|s| s.count()).collect();
        assert_eq!(counts, [4, 4, 2]);

        let archive = record.artifact_for(DownloadVariant::Archive).unwrap();
        assert_eq!(&archive.bytes[..2], &CONTAINER_SIGNATURE);
        let stats = record.archive_stats().unwrap();
        assert!(stats.compressed_total < stats.uncompressed_total);

        let second = record.artifact_for(DownloadVariant::Batch(2)).unwrap();
        assert_eq!(second.record_count, 4);
        assert!(second.suggested_filename.contains("batch_2"));
        assert_eq!(record.metrics.chunk_elapsed_ms.len(), 3);
    }

    #[tokio::test]
    async fn filter_export_uses_the_adapter() {
        let rows = serde_json::json!([
            {"id": 1, "full_name": "A", "program_id": "p1", "form_status": 2},
            {"id": 2, "full_name": "B", "program_id": "p1", "form_status": 0},
            {"id": 3, "full_name": "C", "program_id": "p2", "form_status": 2}
        ]);
        let coordinator = coordinator_with_source(rows, EngineConfig::for_testing());
        let request = inline_request(serde_json::json!({
            "filters": {"program_id": "p1", "has_submitted_form": true}
        }));
        let record = coordinator.run(ExportType::Participants, request).await.unwrap();
        assert_eq!(record.record_count, 1);
    }

    #[tokio::test]
    async fn filters_without_adapter_are_unavailable() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let request = inline_request(serde_json::json!({"filters": {"program_id": "p1"}}));
        let err = coordinator.run(ExportType::Participants, request).await.unwrap_err();
        assert_eq!(err.code(), "source_unavailable");
    }

    #[tokio::test]
    async fn unknown_template_registers_nothing() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let request = inline_request(serde_json::json!({"data": [], "template": "bogus"}));
        let err = coordinator.run(ExportType::Participants, request).await.unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(coordinator.registry().is_empty());
    }

    #[tokio::test]
    async fn oversized_chunk_override_is_rejected() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let mut request = inline_request(serde_json::json!({"force_chunking": true, "chunk_size": 20000}));
        request.data = Some(serde_json::from_value(participants(5)).unwrap());
        let err = coordinator.run(ExportType::Participants, request).await.unwrap_err();
        assert_eq!(err.code(), "template_limit_exceeded");
    }

    #[tokio::test]
    async fn backpressure_when_total_gate_is_closed() {
        let config = EngineConfig {
            max_concurrent_exports: 0,
            ..EngineConfig::for_testing()
        };
        let coordinator = coordinator(config);
        let request = inline_request(serde_json::json!({"data": []}));
        let err = coordinator.run(ExportType::Participants, request).await.unwrap_err();
        assert_eq!(err.code(), "backpressure");
    }

    #[tokio::test]
    async fn csv_format_produces_csv_artifact() {
        let coordinator = coordinator(EngineConfig::for_testing());
        let mut request = inline_request(serde_json::json!({"format": "csv"}));
        request.data = Some(serde_json::from_value(participants(2)).unwrap());
        let record = coordinator.run(ExportType::Participants, request).await.unwrap();
        let artifact = record.artifact_for(DownloadVariant::Default).unwrap();
        assert_eq!(artifact.mime_type, "text/csv");
        let text = String::from_utf8(artifact.bytes.clone()).unwrap();
        assert!(text.starts_with("ID,Full Name"));
    }

    #[tokio::test]
    async fn keep_last_n_holds_after_insertions() {
        let config = EngineConfig {
            keep_last_n: 3,
            ..EngineConfig::for_testing()
        };
        let registry = Arc::new(ExportRegistry::new(config.retention_policy()));
        let coordinator: ExportCoordinator<InMemorySource> =
            ExportCoordinator::new(Arc::clone(&registry), None, config);

        let mut ids = Vec::new();
        for _ in 0..4 {
            let request = inline_request(serde_json::json!({"data": [{"id": 1}]}));
            let record = coordinator.run(ExportType::Participants, request).await.unwrap();
            ids.push(record.id.clone());
        }
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup_and_pin(&ids[0]).is_none());
        for id in &ids[1..] {
            assert!(registry.lookup_and_pin(id).is_some());
        }
    }
}
