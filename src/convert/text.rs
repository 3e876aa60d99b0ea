//! Plain-text plan exports.
//!
//! Pages are separated by form feeds. Tables are either delimited (`|` or
//! tab separated) or column-aligned with runs of spaces.

use super::{decode_utf8, detect_tables, DecodedDocument, PageDecoder, PageTable, RawPage, SourceDocument};
use crate::error::Result;
use crate::model::Table;
use crate::parser::layout::{spans_from_text, TEXT_LINE_HEIGHT};
use crate::parser::table_detector::TableDetector;
use crate::parser::ExtractOptions;

/// Decoder for `text/plain` documents.
#[derive(Debug, Default)]
pub struct TextDecoder;

impl TextDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one page of text.
    pub fn decode_page(number: u32, text: &str, detector: &TableDetector) -> RawPage {
        let lines: Vec<&str> = text.lines().collect();
        let (mut tables, consumed) = delimited_tables(&lines);

        // Blank out delimited rows so the aligned detector does not see them
        // again; line indexes stay intact.
        let remaining: Vec<&str> = lines
            .iter()
            .enumerate()
            .map(|(i, l)| if consumed[i] { "" } else { *l })
            .collect();
        let spans = spans_from_text(&remaining.join("\n"));
        tables.extend(detect_tables(spans, detector, |y| {
            (-y / TEXT_LINE_HEIGHT).round().max(0.0) as usize
        }));
        tables.sort_by_key(|t| t.line);

        RawPage {
            number,
            text: text.to_string(),
            tables,
            ..Default::default()
        }
    }
}

impl PageDecoder for TextDecoder {
    fn name(&self) -> &str {
        "text"
    }

    fn mime_types(&self) -> &[&str] {
        &["text/plain"]
    }

    fn decode(&self, doc: &SourceDocument, options: &ExtractOptions) -> Result<DecodedDocument> {
        let content = decode_utf8(&doc.bytes);
        let detector = TableDetector::with_config(options.text_tables.clone());

        let mut chunks: Vec<&str> = content.split('\x0C').collect();
        if chunks.len() > 1 && chunks.last().is_some_and(|c| c.trim().is_empty()) {
            chunks.pop();
        }

        let pages = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| Self::decode_page(i as u32 + 1, chunk, &detector))
            .collect();

        Ok(DecodedDocument {
            name: doc.name.clone(),
            mime: "text/plain".to_string(),
            pages,
            warnings: Vec::new(),
        })
    }
}

/// Split a delimited line into trimmed cells.
fn delimited_cells(line: &str) -> Option<Vec<String>> {
    let delimiter = if line.contains('|') {
        '|'
    } else if line.contains('\t') {
        '\t'
    } else {
        return None;
    };

    let mut cells: Vec<String> = line.split(delimiter).map(|c| c.trim().to_string()).collect();
    if delimiter == '|' {
        // Leading and trailing pipes frame the row.
        if cells.first().is_some_and(|c| c.is_empty()) {
            cells.remove(0);
        }
        if cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
    }
    (cells.len() >= 2).then_some(cells)
}

/// Markdown-style rule rows such as `|---|:--:|`.
fn is_rule_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | '=' | '+')))
}

/// Collect runs of two or more delimited lines as tables.
fn delimited_tables(lines: &[&str]) -> (Vec<PageTable>, Vec<bool>) {
    let mut consumed = vec![false; lines.len()];
    let mut tables = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let start = i;
        let mut rows: Vec<Vec<String>> = Vec::new();
        while i < lines.len() {
            match delimited_cells(lines[i]) {
                Some(cells) => {
                    if !is_rule_row(&cells) {
                        rows.push(cells);
                    }
                    i += 1;
                }
                None => break,
            }
        }

        if rows.len() >= 2 {
            for flag in consumed.iter_mut().take(i).skip(start) {
                *flag = true;
            }
            tables.push(PageTable::new(Table::from_rows(rows), Some(start)));
        }
        if i == start {
            i += 1;
        }
    }

    (tables, consumed)
}
