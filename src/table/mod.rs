//! Append-only in-memory table of parsed records.

use crate::error::TableError;
use crate::parser::Record;

/// Ordered rows in file order. Rows may have different lengths.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Record>,
    /// Widest row seen so far
    column_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: Vec::with_capacity(rows),
            column_count: 0,
        }
    }

    /// Append a record as the next row
    pub fn append(&mut self, record: Record) {
        self.column_count = self.column_count.max(record.len());
        self.rows.push(record);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Maximum number of fields across all rows
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Result<&Record, TableError> {
        self.rows.get(index).ok_or(TableError::OutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    /// Cell text, or `None` for a missing row or a short (ragged) row
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn rows(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.column_count = 0;
    }

    /// Drop spare capacity once loading has finished
    pub fn shrink_to_fit(&mut self) {
        self.rows.shrink_to_fit();
    }
}

impl FromIterator<Record> for Table {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut table = Table::new();
        for record in iter {
            table.append(record);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_rows() {
        let table: Table = [
            Record::from(&["a", "b", "c"][..]),
            Record::from(&["d"][..]),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.cell(1, 0), Some("d"));
        assert_eq!(table.cell(1, 2), None);
        assert_eq!(table.cell(5, 0), None);
    }

    #[test]
    fn test_row_out_of_range() {
        let mut table = Table::new();
        table.append(Record::from(&["x"][..]));

        assert!(table.row(0).is_ok());
        assert_eq!(
            table.row(1),
            Err(TableError::OutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn test_clear_resets_columns() {
        let mut table = Table::new();
        table.append(Record::from(&["x", "y"][..]));
        table.clear();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
    }
}
