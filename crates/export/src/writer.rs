//! Workbook emission.
//!
//! Serializes a projected row stream into one spreadsheet artifact as an
//! in-memory byte buffer. The primary engine produces a single-sheet
//! `.xlsx` workbook (styled header, frozen first row, auto-sized
//! columns); a CSV engine serves both the `csv` output format and the
//! last-resort fallback when the primary engine fails at runtime.
//!
//! Every xlsx buffer must pass the container-signature gate (`PK`, more
//! than 100 bytes) before it is accepted; a buffer that fails the gate
//! aborts the job with `artifact_invalid`.

use std::io::Cursor;

use tracing::warn;
use umya_spreadsheet::{Coordinate, Pane, PaneStateValues, PaneValues, SheetView, Worksheet};
use unicode_normalization::UnicodeNormalization;

use crate::artifact::Artifact;
use crate::error::{ExportError, ExportResult};

/// MIME type of the native workbook format.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
/// MIME type of the CSV fallback.
pub const CSV_MIME: &str = "text/csv";
/// MIME type of the chunk archive.
pub const ZIP_MIME: &str = "application/zip";

/// The two leading bytes of the workbook/archive container format.
pub const CONTAINER_SIGNATURE: [u8; 2] = [0x50, 0x4B];
/// Minimum plausible byte length for a workbook or archive buffer.
pub const MIN_ARTIFACT_BYTES: usize = 100;

/// Spreadsheet cell character limit.
const MAX_CELL_CHARS: usize = 32_767;
/// Sheet label character limit.
const MAX_SHEET_LABEL_CHARS: usize = 31;
/// Column width bounds (character units).
const MIN_COLUMN_WIDTH: f64 = 10.0;
const MAX_COLUMN_WIDTH: f64 = 60.0;

/// Header styling: dark fill, light bold text.
const HEADER_FILL_ARGB: &str = "FF1F4E79";
const HEADER_FONT_ARGB: &str = "FFFFFFFF";

/// Requested output format for an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OutputFormat {
    /// Native workbook output (the default).
    #[default]
    #[serde(rename = "excel", alias = "xlsx")]
    Excel,
    /// Plain CSV output.
    #[serde(rename = "csv")]
    Csv,
}

impl OutputFormat {
    /// File extension for generated names.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Excel => "xlsx",
            OutputFormat::Csv => "csv",
        }
    }
}

/// A rendering backend: turns a row stream into file bytes.
///
/// Both the primary workbook path and the CSV fallback sit behind this
/// trait so engine selection happens in exactly one place.
pub trait WorkbookEngine: Send + Sync {
    /// Engine name, for logs and health reporting.
    fn name(&self) -> &'static str;

    /// MIME type of the bytes this engine produces.
    fn mime_type(&self) -> &'static str;

    /// Renders sanitized rows into a file buffer.
    fn render(
        &self,
        sheet_label: &str,
        rows: &mut dyn Iterator<Item = Vec<String>>,
    ) -> Result<Vec<u8>, String>;
}

/// The native single-sheet workbook engine.
pub struct XlsxEngine;

impl WorkbookEngine for XlsxEngine {
    fn name(&self) -> &'static str {
        "umya-spreadsheet"
    }

    fn mime_type(&self) -> &'static str {
        XLSX_MIME
    }

    fn render(
        &self,
        sheet_label: &str,
        rows: &mut dyn Iterator<Item = Vec<String>>,
    ) -> Result<Vec<u8>, String> {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book
            .get_sheet_mut(&0)
            .ok_or_else(|| "new workbook has no sheet".to_string())?;
        sheet.set_name(sheet_label);

        let mut widths: Vec<usize> = Vec::new();
        let mut row_idx: u32 = 0;
        for row in rows {
            row_idx += 1;
            for (col_zero, cell) in row.iter().enumerate() {
                let col = col_zero as u32 + 1;
                sheet.get_cell_mut((col, row_idx)).set_value_string(cell);
                if row_idx == 1 {
                    let style = sheet.get_style_mut((col, row_idx));
                    style.set_background_color(HEADER_FILL_ARGB);
                    let font = style.get_font_mut();
                    font.set_bold(true);
                    font.get_color_mut().set_argb(HEADER_FONT_ARGB);
                }
                let observed = cell.chars().count();
                if col_zero >= widths.len() {
                    widths.resize(col_zero + 1, 0);
                }
                if observed > widths[col_zero] {
                    widths[col_zero] = observed;
                }
            }
        }

        for (col_zero, observed) in widths.iter().enumerate() {
            let width = ((*observed as f64) + 2.0).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            sheet
                .get_column_dimension_mut(&column_letter(col_zero as u32 + 1))
                .set_width(width);
        }

        if row_idx > 0 {
            freeze_header_row(sheet);
        }

        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&book, &mut cursor)
            .map_err(|e| format!("workbook serialization failed: {:?}", e))?;
        Ok(cursor.into_inner())
    }
}

/// The CSV fallback engine.
pub struct CsvEngine;

impl WorkbookEngine for CsvEngine {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        CSV_MIME
    }

    fn render(
        &self,
        _sheet_label: &str,
        rows: &mut dyn Iterator<Item = Vec<String>>,
    ) -> Result<Vec<u8>, String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer
                .write_record(&row)
                .map_err(|e| format!("csv write failed: {}", e))?;
        }
        writer
            .into_inner()
            .map_err(|e| format!("csv flush failed: {}", e))
    }
}

/// Writes one artifact from a projected row stream.
///
/// Rows are sanitized cell by cell (normalization, control stripping,
/// clamping, formula escaping) before rendering. For [`OutputFormat::Excel`]
/// the primary engine is used and its output must pass the signature
/// gate; if the primary engine itself fails, the writer degrades to CSV
/// and the artifact's MIME type tells the caller which path was taken.
pub fn write_artifact(
    format: OutputFormat,
    sheet_label: &str,
    rows: impl Iterator<Item = Vec<String>>,
    suggested_filename: String,
    record_count: u64,
) -> ExportResult<Artifact> {
    let label = sanitize_sheet_label(sheet_label);
    let mut sanitized = rows.map(|row| row.into_iter().map(|cell| sanitize_cell(&cell)).collect::<Vec<_>>());

    match format {
        OutputFormat::Csv => {
            let bytes = CsvEngine
                .render(&label, &mut sanitized)
                .map_err(ExportError::Internal)?;
            Ok(csv_artifact(bytes, suggested_filename, record_count))
        }
        OutputFormat::Excel => {
            // The projector is single-pass, so buffer the sanitized rows
            // once in case the primary engine fails midway.
            let buffered: Vec<Vec<String>> = sanitized.collect();
            match XlsxEngine.render(&label, &mut buffered.iter().cloned()) {
                Ok(bytes) => {
                    validate_container(&bytes)?;
                    Ok(Artifact {
                        uncompressed_size: bytes.len() as u64,
                        bytes,
                        mime_type: XLSX_MIME,
                        suggested_filename,
                        record_count,
                    })
                }
                Err(reason) => {
                    warn!(%reason, "workbook engine failed, falling back to csv output");
                    let bytes = CsvEngine
                        .render(&label, &mut buffered.into_iter())
                        .map_err(ExportError::Internal)?;
                    let filename = suggested_filename
                        .strip_suffix(".xlsx")
                        .map(|stem| format!("{}.csv", stem))
                        .unwrap_or(suggested_filename);
                    Ok(csv_artifact(bytes, filename, record_count))
                }
            }
        }
    }
}

fn csv_artifact(bytes: Vec<u8>, suggested_filename: String, record_count: u64) -> Artifact {
    Artifact {
        uncompressed_size: bytes.len() as u64,
        bytes,
        mime_type: CSV_MIME,
        suggested_filename,
        record_count,
    }
}

/// The signature/size gate applied to workbook and archive buffers.
pub fn validate_container(bytes: &[u8]) -> ExportResult<()> {
    if bytes.len() <= MIN_ARTIFACT_BYTES {
        return Err(ExportError::ArtifactInvalid(format!(
            "buffer is {} bytes, below the {} byte minimum",
            bytes.len(),
            MIN_ARTIFACT_BYTES
        )));
    }
    if bytes[..2] != CONTAINER_SIGNATURE {
        return Err(ExportError::ArtifactInvalid(
            "buffer does not start with the container signature".to_string(),
        ));
    }
    Ok(())
}

/// Sanitizes one cell for emission.
///
/// Applies NFC normalization, strips ASCII control characters other than
/// tab and newline, clamps to the cell character limit, and prefixes an
/// apostrophe when the text would otherwise be interpreted as a formula.
pub fn sanitize_cell(cell: &str) -> String {
    let mut text: String = cell
        .nfc()
        .filter(|c| !c.is_control() || *c == '\t' || *c == '\n')
        .collect();
    if text.chars().count() > MAX_CELL_CHARS {
        text = text.chars().take(MAX_CELL_CHARS).collect();
    }
    if text.starts_with(['=', '+', '-', '@']) {
        text.insert(0, '\'');
    }
    text
}

/// Truncates and strips a sheet label to the workbook rules.
pub fn sanitize_sheet_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '?' | '*' | '[' | ']' | ':'))
        .collect();
    let cleaned = cleaned.trim();
    let truncated: String = cleaned.chars().take(MAX_SHEET_LABEL_CHARS).collect();
    if truncated.is_empty() {
        "Export".to_string()
    } else {
        truncated
    }
}

/// Spreadsheet column letter for a 1-based index (1 → A, 27 → AA).
fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push(b'A' + rem);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_else(|_| "A".to_string())
}

/// Freezes the header row so it stays visible while scrolling.
fn freeze_header_row(sheet: &mut Worksheet) {
    let mut pane = Pane::default();
    pane.set_vertical_split(1.0);
    let mut top_left_cell = Coordinate::default();
    top_left_cell.set_coordinate("A2");
    pane.set_top_left_cell(top_left_cell);
    pane.set_active_pane(PaneValues::BottomLeft);
    pane.set_state(PaneStateValues::Frozen);

    let views = sheet.get_sheet_views_mut().get_sheet_view_list_mut();
    if views.is_empty() {
        views.push(SheetView::default());
    }
    views[0].set_pane(pane);
}
