//! The source adapter contract.
//!
//! Database-sourced exports pull rows through a [`SourceAdapter`]: a
//! count call to resolve the total, then restartable range fetches the
//! coordinator issues per chunk so a multi-file job never holds more
//! than one chunk of records. The filter vocabulary is closed; unknown
//! keys fail deserialization and surface as validation errors.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::value::{Record, Value};

/// Errors surfaced by a source adapter.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backing store cannot be reached.
    #[error("source unavailable: {0}")]
    Unavailable(String),
    /// The store rejected the query.
    #[error("source query failed: {0}")]
    Query(String),
}

/// Sort direction for advisory ordering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// The closed set of predicates a source adapter understands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterSpec {
    /// Program scope; required for database-sourced exports.
    pub program_id: Option<String>,
    /// Inclusive window start on the registration date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive window end on the registration date.
    pub date_to: Option<NaiveDate>,
    /// Category equality.
    pub category: Option<String>,
    /// Category membership; matches any listed value.
    pub categories: Option<Vec<String>>,
    /// Registration-form status equality.
    pub form_status: Option<i64>,
    /// Payment status equality.
    pub payment_status: Option<i64>,
    /// Join-based existence: participant has a completed payment.
    pub has_successful_payment: Option<bool>,
    /// Join-based existence: participant submitted the registration form.
    pub has_submitted_form: Option<bool>,
    /// Hard row limit applied after all predicates.
    pub limit: Option<u64>,
    /// Advisory sort field, passed through when the adapter supports it.
    pub sort_by: Option<String>,
    /// Advisory sort direction.
    pub sort_order: Option<SortOrder>,
}

/// Provides a restartable finite row stream for a typed filter.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter name, for logs and health reporting.
    fn name(&self) -> &'static str;

    /// Total rows matching `filter`.
    async fn count(&self, filter: &FilterSpec) -> Result<u64, SourceError>;

    /// Rows `[offset, offset + limit)` of the filtered, ordered result.
    ///
    /// Implementations must return the same ordering across calls for a
    /// fixed filter so chunk ranges partition the result cleanly.
    async fn fetch_range(
        &self,
        filter: &FilterSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, SourceError>;
}

/// An in-memory adapter over a fixed row set.
///
/// Used by the test suites and available for embedding; applies the full
/// filter vocabulary against record fields.
#[derive(Debug, Default)]
pub struct InMemorySource {
    rows: Vec<Record>,
}

impl InMemorySource {
    /// Creates an adapter over `rows`.
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    fn matches(record: &Record, filter: &FilterSpec) -> bool {
        if let Some(program_id) = &filter.program_id {
            if record.get("program_id").map(Value::natural_string).as_deref() != Some(program_id) {
                return false;
            }
        }
        if let Some(category) = &filter.category {
            if record.get("category").map(Value::natural_string).as_deref() != Some(category) {
                return false;
            }
        }
        if let Some(categories) = &filter.categories {
            let value = record.get("category").map(Value::natural_string);
            match value {
                Some(v) if categories.iter().any(|c| c == &v) => {}
                _ => return false,
            }
        }
        if let Some(form_status) = filter.form_status {
            if record.get("form_status").and_then(Value::as_status_code) != Some(form_status) {
                return false;
            }
        }
        if let Some(payment_status) = filter.payment_status {
            if record.get("payment_status").and_then(Value::as_status_code) != Some(payment_status)
            {
                return false;
            }
        }
        if let Some(wanted) = filter.has_successful_payment {
            let has = record.get("payment_status").and_then(Value::as_status_code) == Some(2);
            if has != wanted {
                return false;
            }
        }
        if let Some(wanted) = filter.has_submitted_form {
            let has = record.get("form_status").and_then(Value::as_status_code) == Some(2);
            if has != wanted {
                return false;
            }
        }
        if filter.date_from.is_some() || filter.date_to.is_some() {
            let date = record
                .get("registration_date")
                .map(Value::natural_string)
                .and_then(|s| parse_filter_date(&s));
            let Some(date) = date else { return false };
            if let Some(from) = filter.date_from {
                if date < from {
                    return false;
                }
            }
            if let Some(to) = filter.date_to {
                if date > to {
                    return false;
                }
            }
        }
        true
    }

    fn filtered(&self, filter: &FilterSpec) -> Vec<&Record> {
        let mut matched: Vec<&Record> = self
            .rows
            .iter()
            .filter(|r| Self::matches(r, filter))
            .collect();
        if let Some(sort_by) = &filter.sort_by {
            matched.sort_by_key(|r| r.get(sort_by).map(Value::natural_string).unwrap_or_default());
            if filter.sort_order == Some(SortOrder::Desc) {
                matched.reverse();
            }
        }
        if let Some(limit) = filter.limit {
            matched.truncate(limit as usize);
        }
        matched
    }
}

fn parse_filter_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

#[async_trait]
impl SourceAdapter for InMemorySource {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn count(&self, filter: &FilterSpec) -> Result<u64, SourceError> {
        Ok(self.filtered(filter).len() as u64)
    }

    async fn fetch_range(
        &self,
        filter: &FilterSpec,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>, SourceError> {
        Ok(self
            .filtered(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Record> {
        serde_json::from_value(serde_json::json!([
            {"id": 1, "program_id": "p1", "category": "student", "form_status": 2, "payment_status": 2, "registration_date": "2025-07-01"},
            {"id": 2, "program_id": "p1", "category": "professional", "form_status": 1, "payment_status": 0, "registration_date": "2025-07-10"},
            {"id": 3, "program_id": "p2", "category": "student", "form_status": 0, "payment_status": 4, "registration_date": "2025-07-20"},
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn program_scope_filters_rows() {
        let source = InMemorySource::new(rows());
        let filter = FilterSpec {
            program_id: Some("p1".into()),
            ..Default::default()
        };
        assert_eq!(source.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn existence_predicates() {
        let source = InMemorySource::new(rows());
        let paid = FilterSpec {
            has_successful_payment: Some(true),
            ..Default::default()
        };
        assert_eq!(source.count(&paid).await.unwrap(), 1);
        let submitted = FilterSpec {
            has_submitted_form: Some(true),
            ..Default::default()
        };
        assert_eq!(source.count(&submitted).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn date_window_is_inclusive() {
        let source = InMemorySource::new(rows());
        let filter = FilterSpec {
            date_from: Some(NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()),
            date_to: Some(NaiveDate::from_ymd_opt(2025, 7, 20).unwrap()),
            ..Default::default()
        };
        assert_eq!(source.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn range_fetch_is_restartable_and_stable() {
        let source = InMemorySource::new(rows());
        let filter = FilterSpec::default();
        let first = source.fetch_range(&filter, 0, 2).await.unwrap();
        let again = source.fetch_range(&filter, 0, 2).await.unwrap();
        assert_eq!(first, again);
        let rest = source.fetch_range(&filter, 2, 10).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn unknown_filter_keys_are_rejected() {
        let result: Result<FilterSpec, _> =
            serde_json::from_value(serde_json::json!({"program_id": "p1", "favorite_color": "red"}));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn limit_caps_the_result() {
        let source = InMemorySource::new(rows());
        let filter = FilterSpec {
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(source.count(&filter).await.unwrap(), 2);
    }
}
