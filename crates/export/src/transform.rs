//! Value transformation.
//!
//! A closed, side-effect-free mapping from a raw record field to its
//! presentation string, selected by the column descriptor's
//! [`TransformKind`] tag. The transformer never fails: every malformed or
//! absent input maps to a defined empty/default output, so a single bad
//! record can never abort a whole export.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::value::{Record, Value};

/// Default rendered for a status code missing from its mapping table.
pub const STATUS_UNKNOWN: &str = "Unknown";

/// How one output column is sourced and transformed.
///
/// Templates are data, not a type hierarchy: all transform behavior lives
/// here, selected by the [`TransformKind`] tag, and kind-specific
/// parameters ride along in the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// The record field this column reads.
    pub source: &'static str,
    /// The header label emitted in row 1.
    pub header: &'static str,
    /// The transformation applied to the raw value.
    pub transform: TransformKind,
}

/// Creates a column descriptor; used by the template catalog.
pub const fn col(
    source: &'static str,
    header: &'static str,
    transform: TransformKind,
) -> ColumnDescriptor {
    ColumnDescriptor {
        source,
        header,
        transform,
    }
}

/// The closed set of recognized transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Natural string form; absent → empty.
    Passthrough,
    /// Registration-form status table lookup.
    StatusMap,
    /// Payment status table lookup.
    PaymentStatusMap,
    /// Truthy → "Yes", falsy or absent → "No".
    BooleanYesNo,
    /// `YYYY-MM-DD` for dates, `YYYY-MM-DDTHH:MM:SSZ` for datetimes;
    /// invalid or absent → empty.
    DateIso,
    /// `DD-MM-YYYY`; invalid or absent → empty.
    DateLocale,
    /// Two-decimal amount with an optional symbol prefix; absent → empty.
    Currency {
        /// Currency symbol prepended to the amount, if any.
        symbol: Option<&'static str>,
    },
    /// Concatenates a country-code field and the source field with one
    /// space; either part missing → the remaining part alone.
    PhoneConcat {
        /// The field holding the country code.
        code_field: &'static str,
    },
    /// Follows a chain of fields through nested records; missing link →
    /// empty.
    JoinLookup {
        /// The lookup-key chain, outermost first.
        path: &'static [&'static str],
    },
    /// Passthrough substituting a literal default when absent.
    DefaultIfAbsent {
        /// The literal emitted for absent values.
        default: &'static str,
    },
}

/// Applies a column descriptor to a record, producing the cell text.
pub fn transform(record: &Record, column: &ColumnDescriptor) -> String {
    let value = record.get(column.source);
    match column.transform {
        TransformKind::Passthrough => value.map(Value::natural_string).unwrap_or_default(),
        TransformKind::StatusMap => map_status(value, form_status_label),
        TransformKind::PaymentStatusMap => map_status(value, payment_status_label),
        TransformKind::BooleanYesNo => {
            if value.map(Value::truthy).unwrap_or(false) {
                "Yes".to_string()
            } else {
                "No".to_string()
            }
        }
        TransformKind::DateIso => match value.and_then(parse_temporal) {
            Some(Temporal::Date(d)) => d.format("%Y-%m-%d").to_string(),
            Some(Temporal::DateTime(dt)) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => String::new(),
        },
        TransformKind::DateLocale => match value.and_then(parse_temporal) {
            Some(Temporal::Date(d)) => d.format("%d-%m-%Y").to_string(),
            Some(Temporal::DateTime(dt)) => dt.format("%d-%m-%Y").to_string(),
            None => String::new(),
        },
        TransformKind::Currency { symbol } => match value.and_then(Value::as_amount) {
            Some(amount) => match symbol {
                Some(sym) => format!("{}{:.2}", sym, amount),
                None => format!("{:.2}", amount),
            },
            None => String::new(),
        },
        TransformKind::PhoneConcat { code_field } => {
            let code = record
                .get(code_field)
                .map(Value::natural_string)
                .unwrap_or_default();
            let number = value.map(Value::natural_string).unwrap_or_default();
            match (code.trim().is_empty(), number.trim().is_empty()) {
                (true, true) => String::new(),
                (true, false) => number.trim().to_string(),
                (false, true) => code.trim().to_string(),
                (false, false) => format!("{} {}", code.trim(), number.trim()),
            }
        }
        TransformKind::JoinLookup { path } => record
            .get_path(path)
            .map(Value::natural_string)
            .unwrap_or_default(),
        TransformKind::DefaultIfAbsent { default } => match value {
            Some(v) => v.natural_string(),
            None => default.to_string(),
        },
    }
}

fn map_status(value: Option<&Value>, label: fn(i64) -> Option<&'static str>) -> String {
    let Some(value) = value else {
        return STATUS_UNKNOWN.to_string();
    };
    if let Some(code) = value.as_status_code() {
        return label(code).unwrap_or(STATUS_UNKNOWN).to_string();
    }
    // Legacy string-enum aliases.
    if let Value::Text(s) = value {
        if let Some(code) = status_alias_code(s) {
            return label(code).unwrap_or(STATUS_UNKNOWN).to_string();
        }
    }
    STATUS_UNKNOWN.to_string()
}

/// The registration-form status table.
pub fn form_status_label(code: i64) -> Option<&'static str> {
    match code {
        0 => Some("Not started"),
        1 => Some("In progress"),
        2 => Some("Submitted"),
        _ => None,
    }
}

/// The payment status table.
pub fn payment_status_label(code: i64) -> Option<&'static str> {
    match code {
        0 => Some("Pending"),
        1 => Some("Processing"),
        2 => Some("Completed"),
        3 => Some("Failed"),
        4 => Some("Cancelled"),
        _ => None,
    }
}

/// Maps legacy string-enum inputs onto the integer tables.
fn status_alias_code(s: &str) -> Option<i64> {
    match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
        "not_started" => Some(0),
        "in_progress" => Some(1),
        "submitted" => Some(2),
        "pending" => Some(0),
        "processing" => Some(1),
        "completed" | "success" => Some(2),
        "failed" => Some(3),
        "cancelled" | "canceled" => Some(4),
        _ => None,
    }
}

enum Temporal {
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

/// Parses a record value into a date or datetime.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD`, and the legacy
/// `DD-MM-YYYY` / `YYYY/MM/DD` forms. Anything else yields `None`.
fn parse_temporal(value: &Value) -> Option<Temporal> {
    let text = match value {
        Value::Text(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Temporal::DateTime(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(Temporal::DateTime(naive.and_utc()));
    }
    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Some(Temporal::Date(date));
        }
    }
    None
}
