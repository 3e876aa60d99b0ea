//! Schedule table detection from text positions (stream mode).
//!
//! Tables are found from alignment alone: rows are grouped by baseline,
//! column edges are the x positions that recur across rows, and a table is a
//! run of consecutive rows that line up with those edges. Drawing schedules
//! rarely have reliable ruling lines in the content stream, so lines are
//! never consulted.

use std::collections::{HashMap, HashSet};

use crate::model::{Table, TableRow};

use super::layout::{TextSpan, TEXT_CHAR_WIDTH};

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Baseline of the first row
    pub top_y: f32,
    /// Baseline of the last row
    pub bottom_y: f32,
    pub left_x: f32,
    pub right_x: f32,
    /// Column start positions
    pub columns: Vec<f32>,
    pub rows: Vec<TableRowData>,
}

/// A row of text spans in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
}

/// Table detector configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Width of the buckets used to count left edges (points)
    pub bucket_size: f32,
    /// Max distance between a span and a column edge to count as aligned
    pub alignment_tolerance: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 12,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            bucket_size: 5.0,
            alignment_tolerance: 5.0,
        }
    }
}

impl TableDetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings for monospaced plain-text pages, where right-aligned numbers
    /// start a character or two after the column edge.
    pub fn for_plain_text() -> Self {
        Self {
            bucket_size: TEXT_CHAR_WIDTH,
            alignment_tolerance: TEXT_CHAR_WIDTH * 2.0,
            ..Self::default()
        }
    }

    pub fn with_min_rows(mut self, rows: usize) -> Self {
        self.min_rows = rows;
        self
    }

    pub fn with_max_columns(mut self, columns: usize) -> Self {
        self.max_columns = columns;
        self
    }

    pub fn with_alignment_ratio(mut self, ratio: f32) -> Self {
        self.min_alignment_ratio = ratio;
        self
    }
}

/// Detects tables in a list of text spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TableDetectorConfig {
        &self.config
    }

    /// Detect tables in the given spans.
    ///
    /// Returns detected tables and the spans that were NOT part of tables.
    pub fn detect(&self, spans: Vec<TextSpan>) -> (Vec<DetectedTable>, Vec<TextSpan>) {
        let cfg = &self.config;
        if spans.len() < cfg.min_rows * cfg.min_columns {
            return (vec![], spans);
        }

        let rows = self.group_into_rows(&spans);
        if rows.len() < cfg.min_rows {
            return (vec![], spans);
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "TableDetector: {} rows, page columns at {:?}",
            rows.len(),
            columns
        );
        if columns.len() < cfg.min_columns {
            return (vec![], spans);
        }

        let mut detected = Vec::new();
        let mut used: HashSet<(u32, u32, String)> = HashSet::new();

        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();
            let table_columns = self.detect_columns(&table_rows);

            if table_columns.len() < cfg.min_columns {
                continue;
            }
            if table_columns.len() > cfg.max_columns {
                log::debug!(
                    "TableDetector: skipping region with {} columns",
                    table_columns.len()
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping list-like region");
                continue;
            }

            for span in table_rows.iter().flat_map(|r| r.spans.iter()) {
                used.insert(span_key(span));
            }

            let all_spans = || table_rows.iter().flat_map(|r| r.spans.iter());
            let left_x = all_spans().map(|s| s.x).fold(f32::INFINITY, f32::min);
            let right_x = all_spans().map(|s| s.right()).fold(f32::NEG_INFINITY, f32::max);

            detected.push(DetectedTable {
                top_y: table_rows[0].y,
                bottom_y: table_rows[table_rows.len() - 1].y,
                left_x,
                right_x,
                columns: table_columns,
                rows: table_rows,
            });
        }

        let unused = spans
            .into_iter()
            .filter(|s| !used.contains(&span_key(s)))
            .collect();

        (detected, unused)
    }

    /// Group spans into rows by Y position, top of page first.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        super::layout::group_into_lines(spans, self.config.y_tolerance_factor)
            .into_iter()
            .map(|line| TableRowData {
                y: line.y,
                spans: line.spans,
            })
            .collect()
    }

    /// Column edges: bucketed left edges that recur in enough rows.
    ///
    /// Rows with two or more spans are preferred; when too few exist every
    /// row is counted and each span counts separately.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let cfg = &self.config;
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let (sample, once_per_row): (Vec<&TableRowData>, bool) = if multi.len() >= cfg.min_rows {
            (multi, true)
        } else {
            (rows.iter().collect(), false)
        };
        if sample.is_empty() {
            return vec![];
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &sample {
            let buckets = row
                .spans
                .iter()
                .map(|s| (s.x / cfg.bucket_size).round() as i32);
            if once_per_row {
                for bucket in buckets.collect::<HashSet<_>>() {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            } else {
                for bucket in buckets {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
        }

        let min_occurrences =
            ((sample.len() as f32 * cfg.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * cfg.bucket_size)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < cfg.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Find contiguous row regions that form tables.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.spans.len() >= 2
                && self.alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }

    /// Fraction of a row's spans that start on a column edge.
    fn alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let tolerance = self.config.alignment_tolerance;
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= tolerance))
            .count();
        aligned as f32 / row.spans.len() as f32
    }

    /// Convert a detected table to the model table. The first row is the header.
    pub fn to_table_model(&self, detected: &DetectedTable) -> Table {
        let columns = &detected.columns;
        let mut table = Table::with_header(if detected.rows.len() > 1 { 1 } else { 0 });

        for (row_idx, row) in detected.rows.iter().enumerate() {
            let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for span in &row.spans {
                let col = self.column_for_span(span.x, columns);
                cells[col].push(span.text.trim());
            }
            let cells: Vec<String> = cells.into_iter().map(|parts| parts.join(" ")).collect();

            if row_idx == 0 && table.header_rows > 0 {
                table.add_row(TableRow::header(cells));
            } else {
                table.add_row(TableRow::new(cells));
            }
        }

        table
    }

    /// Column whose range contains `x`, tolerating spans that start a little
    /// early; the nearest edge otherwise.
    fn column_for_span(&self, x: f32, columns: &[f32]) -> usize {
        let tolerance = self.config.alignment_tolerance;
        for (i, &col_start) in columns.iter().enumerate() {
            let col_end = columns.get(i + 1).copied().unwrap_or(f32::INFINITY);
            if x >= col_start - tolerance && x < col_end - tolerance {
                return i;
            }
        }

        columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (x - **a)
                    .abs()
                    .partial_cmp(&(x - **b).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Numbered or bulleted notes look like two-column tables; reject them.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(first) = row.spans.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let n = rows.len() as f32;
        if bullets as f32 / n >= 0.5 {
            return true;
        }
        columns.len() == 2 && (bullets + numbers) as f32 / n >= 0.5
    }
}

fn span_key(span: &TextSpan) -> (u32, u32, String) {
    (span.x.to_bits(), span.y.to_bits(), span.text.clone())
}

/// Check if text is a bullet marker.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "►" | "■" | "●" | "□" | "◆"
    )
}

/// Check if text is a numbered note marker ("1.", "2)", "a.").
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let suffix = &cleaned[pos..];
        if pos > 0 && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
