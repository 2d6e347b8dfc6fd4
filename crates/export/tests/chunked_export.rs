//! Tests for chunked export processing.
//!
//! These tests verify that chunked multi-file exports produce the same
//! row content as a single-file export while holding only one chunk of
//! records at a time, and that the boundary behaviors around the
//! single-file ceiling hold exactly.

use std::io::{Cursor, Read};
use std::sync::Arc;

use helios_export::{
    DownloadVariant, EngineConfig, ExportCoordinator, ExportRegistry, ExportRequest, ExportType,
    InMemorySource, Strategy,
};

fn coordinator(config: EngineConfig) -> ExportCoordinator<InMemorySource> {
    let registry = Arc::new(ExportRegistry::new(config.retention_policy()));
    ExportCoordinator::new(registry, None, config)
}

fn request_with_rows(count: usize, extra: serde_json::Value) -> ExportRequest {
    let rows: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "id": i,
                "full_name": format!("Participant {}", i),
                "email": format!("p{}@example.org", i),
                "country": if i % 2 == 0 { "UK" } else { "US" },
                "form_status": (i % 3) as i64,
                "payment_status": (i % 5) as i64,
            })
        })
        .collect();
    let mut body = extra;
    body["data"] = serde_json::Value::Array(rows);
    serde_json::from_value(body).unwrap()
}

/// Extracts the CSV-ish cell grid from a produced csv artifact.
fn csv_rows(bytes: &[u8]) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(bytes);
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn record_count_at_ceiling_stays_single() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(15_000, serde_json::json!({"format": "csv"}));
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();
    assert_eq!(record.strategy, Strategy::Single);
    assert_eq!(record.record_count, 15_000);
    assert!(record.chunk_spans().is_empty());
}

#[tokio::test]
async fn record_count_past_ceiling_chunks_and_archives() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(15_001, serde_json::json!({"format": "csv"}));
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();

    assert_eq!(record.strategy, Strategy::Multi);
    let counts: Vec<u64> = record.chunk_spans().iter().map(|s| s.count()).collect();
    assert_eq!(counts, [5_000, 5_000, 5_000, 1]);

    // Spans partition [1, 15001] contiguously and disjointly.
    let mut next_start = 1;
    for span in record.chunk_spans() {
        assert_eq!(span.start, next_start);
        next_start = span.end + 1;
    }
    assert_eq!(next_start, 15_002);

    // Batch filenames carry their numbering.
    for (i, span) in record.chunk_spans().iter().enumerate() {
        let chunk = record.artifact_for(DownloadVariant::Batch(span.index)).unwrap();
        assert!(chunk.suggested_filename.contains(&format!("batch_{}", i + 1)));
    }

    // The archive's uncompressed size equals the sum of chunk sizes.
    let stats = record.archive_stats().unwrap();
    assert!(stats.compressed_total < stats.uncompressed_total);
    let chunk_total: u64 = (1..=record.chunk_spans().len() as u64)
        .map(|n| {
            record
                .artifact_for(DownloadVariant::Batch(n))
                .unwrap()
                .uncompressed_size
        })
        .sum();
    assert_eq!(stats.uncompressed_total, chunk_total);
}

#[tokio::test]
async fn chunked_rows_equal_single_rows() {
    let single = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(10, serde_json::json!({"format": "csv"}));
    let single_record = single.run(ExportType::Participants, request).await.unwrap();
    let single_bytes = &single_record
        .artifact_for(DownloadVariant::Default)
        .unwrap()
        .bytes;
    let single_rows = csv_rows(single_bytes);

    let chunked = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(
        10,
        serde_json::json!({"format": "csv", "force_chunking": true, "chunk_size": 4}),
    );
    let chunked_record = chunked.run(ExportType::Participants, request).await.unwrap();

    // Reassemble data rows across chunks, skipping each chunk's header.
    let mut reassembled = vec![single_rows[0].clone()];
    for n in 1..=chunked_record.chunk_spans().len() as u64 {
        let chunk = chunked_record.artifact_for(DownloadVariant::Batch(n)).unwrap();
        let rows = csv_rows(&chunk.bytes);
        assert_eq!(rows[0], single_rows[0], "chunk {} header differs", n);
        reassembled.extend(rows.into_iter().skip(1));
    }
    assert_eq!(reassembled, single_rows);
}

#[tokio::test]
async fn archive_extraction_round_trips_chunk_bytes() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(
        6,
        serde_json::json!({"force_chunking": true, "chunk_size": 3, "filename": "roster.xlsx"}),
    );
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();

    let archive = record.artifact_for(DownloadVariant::Archive).unwrap();
    assert_eq!(archive.suggested_filename, "roster_complete_export.zip");

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes.clone())).unwrap();
    assert_eq!(zip.len(), 2);
    for index in 0..zip.len() {
        let expected = record
            .artifact_for(DownloadVariant::Batch(index as u64 + 1))
            .unwrap();
        let mut entry = zip.by_index(index).unwrap();
        assert_eq!(entry.name(), expected.suggested_filename);
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, expected.bytes);
    }
}

#[tokio::test]
async fn formula_prefixed_cells_are_escaped_in_output() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request: ExportRequest = serde_json::from_value(serde_json::json!({
        "format": "csv",
        "data": [
            {"id": 1, "full_name": "=SUM(1)", "email": "l@ex.org"},
            {"id": 2, "full_name": "Linus =SUM(1)", "email": "l2@ex.org"}
        ]
    }))
    .unwrap();
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();
    let rows = csv_rows(&record.artifact_for(DownloadVariant::Default).unwrap().bytes);
    // A leading formula trigger gains the escaping apostrophe; an embedded
    // one is left alone.
    assert_eq!(rows[1][1], "'=SUM(1)");
    assert_eq!(rows[2][1], "Linus =SUM(1)");
}

#[tokio::test]
async fn artifacts_survive_a_disk_round_trip() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(4, serde_json::json!({}));
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();
    let artifact = record.artifact_for(DownloadVariant::Default).unwrap();

    // Persist the buffer the way a download client would and re-read it.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(&artifact.suggested_filename);
    std::fs::write(&path, &artifact.bytes).unwrap();
    let reloaded = std::fs::read(&path).unwrap();
    assert_eq!(reloaded, artifact.bytes);
    assert_eq!(&reloaded[..2], b"PK");
}

#[tokio::test]
async fn per_chunk_timings_cover_every_chunk() {
    let coordinator = coordinator(EngineConfig::for_testing());
    let request = request_with_rows(
        9,
        serde_json::json!({"force_chunking": true, "chunk_size": 4}),
    );
    let record = coordinator
        .run(ExportType::Participants, request)
        .await
        .unwrap();
    assert_eq!(record.metrics.chunk_elapsed_ms.len(), 3);
    assert!(record.metrics.chunk_elapsed_ms.iter().all(|ms| *ms >= 1));
}
