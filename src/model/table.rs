//! Schedule table types.

use serde::{Deserialize, Serialize};

/// A table captured from a plan sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows in the table
    pub rows: Vec<TableRow>,

    /// Number of header rows (0 = no header)
    pub header_rows: u8,

    /// Table caption (e.g. the schedule title line above it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Table {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with header.
    pub fn with_header(header_rows: u8) -> Self {
        Self {
            header_rows,
            ..Self::new()
        }
    }

    /// Build a table from string rows, treating the first row as the header.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (i, row) in rows.into_iter().enumerate() {
            let row = TableRow::from_strings(row);
            if i == 0 {
                table.add_row(TableRow::header(row.cells));
                table.header_rows = 1;
            } else {
                table.add_row(row);
            }
        }
        table
    }

    /// Set the caption and return self.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Add a row to the table.
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (based on the widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get header rows.
    pub fn header(&self) -> &[TableRow] {
        let n = (self.header_rows as usize).min(self.rows.len());
        &self.rows[..n]
    }

    /// Get body rows (non-header).
    pub fn body(&self) -> &[TableRow] {
        let n = (self.header_rows as usize).min(self.rows.len());
        &self.rows[n..]
    }

    /// Header cells used for column lookup. Falls back to the first row.
    pub fn header_cells(&self) -> &[String] {
        self.header()
            .last()
            .or_else(|| self.rows.first())
            .map(|r| r.cells.as_slice())
            .unwrap_or(&[])
    }

    /// Find the first column whose upper-cased header satisfies `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.header_cells()
            .iter()
            .position(|cell| pred(&cell.trim().to_uppercase()))
    }

    /// Get plain text representation of the table.
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cell texts in column order
    pub cells: Vec<String>,

    /// Whether this is a header row
    #[serde(default)]
    pub is_header: bool,
}

impl TableRow {
    /// Create a new row with cells.
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            is_header: false,
        }
    }

    /// Create a header row.
    pub fn header(cells: Vec<String>) -> Self {
        Self {
            cells,
            is_header: true,
        }
    }

    /// Create a row from text values.
    pub fn from_strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::new(values.into_iter().map(Into::into).collect())
    }

    /// Trimmed cell text at `index`, `None` if missing or blank.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells
            .get(index)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    /// Get plain text representation.
    pub fn plain_text(&self) -> String {
        self.cells.join("\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_new() {
        let table = Table::new();
        assert!(table.is_empty());
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
        assert!(table.header_cells().is_empty());
    }

    #[test]
    fn test_table_from_rows() {
        let table = Table::from_rows([["Mark", "Qty"], ["W1", "4"], ["W2", "2"]]);

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.header().len(), 1);
        assert_eq!(table.body().len(), 2);
        assert!(table.rows[0].is_header);
    }

    #[test]
    fn test_find_column_is_case_insensitive() {
        let table = Table::from_rows([["mark", "Size", "qty."], ["W1", "3'-0\" x 5'-0\"", "4"]]);
        assert_eq!(table.find_column(|h| h.contains("QTY")), Some(2));
        assert_eq!(table.find_column(|h| h == "SIZE"), Some(1));
        assert_eq!(table.find_column(|h| h == "UOM"), None);
    }

    #[test]
    fn test_cell_blank_is_none() {
        let row = TableRow::from_strings(["W1", "  ", "4"]);
        assert_eq!(row.cell(0), Some("W1"));
        assert_eq!(row.cell(1), None);
        assert_eq!(row.cell(7), None);
    }
}
