//! Row projection.
//!
//! Turns a finite record stream and a template into a header-aligned
//! stream of cell rows. The first yielded row is the template's header
//! labels; every subsequent row is the transformed cells of one record,
//! in column order. The projector buffers no more than one record at a
//! time and is restartable exactly when its upstream iterator is.

use crate::templates::Template;
use crate::transform::{ColumnDescriptor, transform};
use crate::value::Record;

/// Streaming header-first projection over a record iterator.
pub struct RowProjector<I> {
    columns: &'static [ColumnDescriptor],
    records: I,
    header_pending: Option<Vec<String>>,
}

impl<I> RowProjector<I>
where
    I: Iterator<Item = Record>,
{
    /// Creates a projector for `template` over `records`.
    pub fn new(template: &Template, records: I) -> Self {
        RowProjector {
            columns: template.columns,
            records,
            header_pending: Some(template.headers()),
        }
    }
}

impl<I> Iterator for RowProjector<I>
where
    I: Iterator<Item = Record>,
{
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(header) = self.header_pending.take() {
            return Some(header);
        }
        let record = self.records.next()?;
        Some(
            self.columns
                .iter()
                .map(|column| transform(&record, column))
                .collect(),
        )
    }
}

/// Convenience constructor used by the coordinator and tests.
pub fn project<I>(template: &Template, records: I) -> RowProjector<I::IntoIter>
where
    I: IntoIterator<Item = Record>,
{
    RowProjector::new(template, records.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{ExportType, lookup};

    fn participant(id: i64, name: &str, form_status: i64) -> Record {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "full_name": name,
            "email": format!("p{}@example.org", id),
            "country": "UK",
            "form_status": form_status,
            "payment_status": 2,
        }))
        .unwrap()
    }

    #[test]
    fn header_comes_first() {
        let template = lookup(ExportType::Participants, "standard").unwrap();
        let mut rows = project(template, vec![participant(1, "Ada Lovelace", 2)]);

        let header = rows.next().unwrap();
        assert_eq!(header.len(), 10);
        assert_eq!(header[0], "ID");

        let row = rows.next().unwrap();
        assert_eq!(row.len(), 10);
        assert_eq!(row[0], "1");
        assert_eq!(row[1], "Ada Lovelace");
        assert_eq!(row[7], "Submitted");

        assert!(rows.next().is_none());
    }

    #[test]
    fn empty_input_yields_header_only() {
        let template = lookup(ExportType::Participants, "standard").unwrap();
        let mut rows = project(template, Vec::<Record>::new());
        assert!(rows.next().is_some());
        assert!(rows.next().is_none());
    }

    #[test]
    fn cells_align_to_columns_for_sparse_records() {
        let template = lookup(ExportType::Participants, "standard").unwrap();
        let sparse: Record = serde_json::from_value(serde_json::json!({"email": "x@example.org"})).unwrap();
        let rows: Vec<_> = project(template, vec![sparse]).collect();
        assert_eq!(rows[1][2], "x@example.org");
        // Absent passthrough fields render empty; status maps render their default.
        assert_eq!(rows[1][0], "");
        assert_eq!(rows[1][7], "Unknown");
    }
}
