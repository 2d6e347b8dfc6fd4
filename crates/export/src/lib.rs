//! # helios-export - Export Engine
//!
//! This crate is the core of the Helios Export Service: it materializes
//! tabular datasets (participants, payments, ambassadors) into
//! downloadable spreadsheet artifacts. Given a validated export request
//! carrying either inline rows or filter predicates for a source
//! adapter, it selects a field-projection template, transforms values,
//! streams rows into one or more workbook artifacts, optionally bundles
//! them into a compressed archive, and registers the result in a
//! retention-bounded in-memory registry.
//!
//! ## Architecture
//!
//! Components in dependency order:
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`value`] | Tagged scalar values and ordered records |
//! | [`transform`] | The closed set of value transformations |
//! | [`templates`] | The static template catalog |
//! | [`projector`] | Header-first streaming row projection |
//! | [`writer`] | Workbook/CSV emission behind a [`writer::WorkbookEngine`] |
//! | [`archiver`] | Deflate bundling of chunk artifacts |
//! | [`planner`] | Single vs. multi-file strategy and chunk spans |
//! | [`registry`] | TTL, keep-last-N, and storage-pressure retention |
//! | [`coordinator`] | End-to-end job orchestration |
//!
//! The [`source::SourceAdapter`] trait is the boundary to the backing
//! store; [`source::InMemorySource`] ships for tests and embedding.
//!
//! ## Guarantees
//!
//! - Workbook artifacts begin with the `PK` container signature and
//!   exceed 100 bytes, or the job fails with `artifact_invalid`.
//! - Chunk record ranges partition the record set contiguously; the
//!   archive's uncompressed size equals the sum of its entries.
//! - After any successful insertion, the N most recent exports are
//!   present in the registry.
//! - Value transformation never fails; malformed fields render their
//!   defined empty/default output.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helios_export::{
//!     EngineConfig, ExportCoordinator, ExportRegistry, ExportRequest, ExportType,
//!     InMemorySource,
//! };
//!
//! # async fn run() -> Result<(), helios_export::ExportError> {
//! let config = EngineConfig::default();
//! let registry = Arc::new(ExportRegistry::new(config.retention_policy()));
//! let coordinator: ExportCoordinator<InMemorySource> =
//!     ExportCoordinator::new(Arc::clone(&registry), None, config);
//!
//! let request: ExportRequest = serde_json::from_str(
//!     r#"{"data": [{"id": 1, "full_name": "Ada Lovelace"}]}"#,
//! ).unwrap();
//! let record = coordinator.run(ExportType::Participants, request).await?;
//! println!("export {} ({} bytes)", record.id, record.total_bytes());
//! # Ok(())
//! # }
//! ```

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod archiver;
pub mod artifact;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod names;
pub mod planner;
pub mod projector;
pub mod registry;
pub mod request;
pub mod source;
pub mod templates;
pub mod transform;
pub mod value;
pub mod writer;

// Re-export commonly used types
pub use artifact::{Artifact, ArchiveStats, DownloadVariant, ExportArtifacts, ExportRecord, ProcessingMetrics};
pub use config::EngineConfig;
pub use coordinator::ExportCoordinator;
pub use error::{ExportError, ExportResult};
pub use planner::{ChunkSpan, Strategy};
pub use registry::{ExportRegistry, RetentionPolicy, StorageInfo, SweepOutcome};
pub use request::{ExportOptions, ExportRequest};
pub use source::{FilterSpec, InMemorySource, SourceAdapter, SourceError, SortOrder};
pub use templates::{ExportType, Template};
pub use value::{Record, Value};
pub use writer::OutputFormat;
