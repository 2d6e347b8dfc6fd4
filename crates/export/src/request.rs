//! Export requests.
//!
//! The request payload accepted by the create endpoint. The option set
//! is closed: unknown fields fail deserialization. Validation happens
//! before any work is done and never mutates the registry.

use serde::Deserialize;

use crate::error::{ExportError, ExportResult};
use crate::source::{FilterSpec, SortOrder};
use crate::templates::{ExportType, lookup};
use crate::value::Record;
use crate::writer::OutputFormat;

/// Advisory ordering options forwarded to the source adapter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportOptions {
    /// Field to sort by, when the adapter supports it.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub sort_order: Option<SortOrder>,
}

/// A validated-on-entry export request.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportRequest {
    /// Inline rows; mutually exclusive with `filters`.
    pub data: Option<Vec<Record>>,
    /// Filter predicates for the source adapter; mutually exclusive
    /// with `data`.
    pub filters: Option<FilterSpec>,
    /// Template name; defaults to `standard`.
    #[serde(default = "default_template")]
    pub template: String,
    /// Output format; defaults to the native workbook.
    #[serde(default)]
    pub format: OutputFormat,
    /// Suggested base filename.
    pub filename: Option<String>,
    /// Sheet label hint.
    pub sheet_name: Option<String>,
    /// Overrides the template's chunk size when the export goes multi.
    pub chunk_size: Option<u64>,
    /// Forces the multi-file strategy.
    #[serde(default)]
    pub force_chunking: bool,
    /// Advisory adapter options.
    #[serde(default)]
    pub options: ExportOptions,
}

fn default_template() -> String {
    "standard".to_string()
}

impl ExportRequest {
    /// Validates the request against the template catalog and the
    /// data-source rules. Returns the resolved template on success.
    pub fn validate(&self, export_type: ExportType) -> ExportResult<&'static crate::templates::Template> {
        let template = lookup(export_type, &self.template).ok_or_else(|| {
            ExportError::validation(format!(
                "unknown template '{}' for export type '{}'",
                self.template, export_type
            ))
        })?;

        match (&self.data, &self.filters) {
            (Some(_), Some(_)) => {
                return Err(ExportError::validation(
                    "'data' and 'filters' are mutually exclusive; provide exactly one",
                ));
            }
            (None, None) => {
                return Err(ExportError::validation(
                    "provide either inline 'data' or 'filters' for a database-sourced export",
                ));
            }
            (None, Some(filters)) => {
                if filters.program_id.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(ExportError::validation(
                        "'filters.program_id' is required for database-sourced exports",
                    ));
                }
            }
            (Some(_), None) => {}
        }

        if self.chunk_size == Some(0) {
            return Err(ExportError::validation("'chunk_size' must be at least 1"));
        }

        Ok(template)
    }

    /// The effective filter, with request-level sort options folded in.
    pub fn effective_filters(&self) -> Option<FilterSpec> {
        let mut filters = self.filters.clone()?;
        if filters.sort_by.is_none() {
            filters.sort_by = self.options.sort_by.clone();
        }
        if filters.sort_order.is_none() {
            filters.sort_order = self.options.sort_order;
        }
        Some(filters)
    }
}
