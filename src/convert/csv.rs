//! CSV schedule exports: one page holding one table.

use super::{decode_utf8, DecodedDocument, PageDecoder, PageTable, RawPage, SourceDocument};
use crate::error::Result;
use crate::model::Table;
use crate::parser::ExtractOptions;

/// Decoder for `text/csv` documents.
#[derive(Debug, Default)]
pub struct CsvDecoder;

impl CsvDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PageDecoder for CsvDecoder {
    fn name(&self) -> &str {
        "csv"
    }

    fn mime_types(&self) -> &[&str] {
        &["text/csv", "application/csv"]
    }

    fn decode(&self, doc: &SourceDocument, _options: &ExtractOptions) -> Result<DecodedDocument> {
        let content = decode_utf8(&doc.bytes);
        let mut records: Vec<Vec<String>> = parse_records(&content)
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .collect();

        // Leading rows with a single filled cell are title lines.
        let mut titles = Vec::new();
        while records
            .first()
            .is_some_and(|r| r.iter().filter(|c| !c.is_empty()).count() <= 1)
        {
            let row = records.remove(0);
            if let Some(title) = row.into_iter().find(|c| !c.is_empty()) {
                titles.push(title);
            }
        }

        let caption = if titles.is_empty() {
            caption_from_name(&doc.name)
        } else {
            titles.join(" ")
        };

        let mut lines = titles.clone();
        lines.extend(records.iter().map(|r| r.join(" | ")));
        let text = if titles.is_empty() {
            format!("{}\n{}", caption, lines.join("\n"))
        } else {
            lines.join("\n")
        };

        let mut page = RawPage::new(1, text);
        if records.len() >= 2 {
            let table = Table::from_rows(records).with_caption(caption);
            page.tables.push(PageTable::new(table, Some(titles.len().max(1))));
        } else {
            log::debug!("'{}' has no header and body rows", doc.name);
        }

        Ok(DecodedDocument {
            name: doc.name.clone(),
            mime: "text/csv".to_string(),
            pages: vec![page],
            warnings: Vec::new(),
        })
    }
}

/// Caption derived from a file name: `door_schedule.csv` -> `DOOR SCHEDULE`.
fn caption_from_name(name: &str) -> String {
    let stem = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    stem.replace(['_', '-'], " ").to_uppercase()
}

/// Split CSV content into records. Quoted fields may hold commas, doubled
/// quotes and newlines.
fn parse_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => record.push(std::mem::take(&mut field).trim().to_string()),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field).trim().to_string());
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field.trim().to_string());
        records.push(record);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_fields() {
        let records = parse_records("MARK,DESCRIPTION,QTY\r\nW1,\"Double hung, 3'-0\"\"x5'-0\"\"\",4\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][1], "Double hung, 3'-0\"x5'-0\"");
        assert_eq!(records[1][2], "4");
    }

    #[test]
    fn test_mid_field_quote_is_literal() {
        let records = parse_records("MARK,SIZE,QTY\nW1,3'-0\" x 5'-0\",4\nT1,12\" TILE \"A\",20\n");
        assert_eq!(records[1], vec!["W1", "3'-0\" x 5'-0\"", "4"]);
        assert_eq!(records[2], vec!["T1", "12\" TILE \"A\"", "20"]);
    }

    #[test]
    fn test_title_row_becomes_caption() {
        let doc = SourceDocument::new("a601.csv", "DOOR SCHEDULE,,\nMARK,TYPE,QTY\nD1,Entry,2\n");
        let decoded = CsvDecoder::new()
            .decode(&doc, &ExtractOptions::default())
            .unwrap();

        let page = &decoded.pages[0];
        assert!(page.text.starts_with("DOOR SCHEDULE"));
        let table = &page.tables[0].table;
        assert_eq!(table.caption.as_deref(), Some("DOOR SCHEDULE"));
        assert_eq!(table.header_cells(), &["MARK", "TYPE", "QTY"]);
        assert_eq!(table.body().len(), 1);
    }

    #[test]
    fn test_caption_from_file_name() {
        let doc = SourceDocument::new("exports/window_schedule.csv", "MARK,QTY\nW1,4\n");
        let decoded = CsvDecoder::new()
            .decode(&doc, &ExtractOptions::default())
            .unwrap();

        let page = &decoded.pages[0];
        assert!(page.text.starts_with("WINDOW SCHEDULE\n"));
        assert_eq!(
            page.tables[0].table.caption.as_deref(),
            Some("WINDOW SCHEDULE")
        );
    }

    #[test]
    fn test_header_only_has_no_table() {
        let doc = SourceDocument::new("empty.csv", "MARK,QTY\n");
        let decoded = CsvDecoder::new()
            .decode(&doc, &ExtractOptions::default())
            .unwrap();
        assert!(decoded.pages[0].tables.is_empty());
    }
}
