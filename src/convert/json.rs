//! Pre-extracted page exports (OCR output, upstream parsers).
//!
//! Accepted shapes are `{"pages": [...]}` or a bare page array. A page is
//! `{page?, text, tables?, handwritten_notes?, ocr_quality?}` where each table
//! is either a list of rows or `{caption?, rows}`.

use serde::Deserialize;
use serde_json::Value;

use super::{DecodedDocument, PageDecoder, PageTable, RawPage, SourceDocument};
use crate::error::{Error, Result};
use crate::model::{OcrQuality, PageContext, Table};
use crate::parser::ExtractOptions;

/// Decoder for `application/json` documents.
#[derive(Debug, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageSet {
    Wrapped { pages: Vec<JsonPage> },
    Bare(Vec<JsonPage>),
}

#[derive(Deserialize)]
struct JsonPage {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    tables: Vec<JsonTable>,
    #[serde(default)]
    handwritten_notes: bool,
    #[serde(default)]
    ocr_quality: OcrQuality,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonTable {
    Captioned {
        #[serde(default)]
        caption: Option<String>,
        rows: Vec<Vec<Value>>,
    },
    Rows(Vec<Vec<Value>>),
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

impl JsonTable {
    fn into_table(self) -> Option<Table> {
        let (caption, rows) = match self {
            JsonTable::Captioned { caption, rows } => (caption, rows),
            JsonTable::Rows(rows) => (None, rows),
        };
        if rows.len() < 2 {
            return None;
        }
        let table = Table::from_rows(rows.iter().map(|r| r.iter().map(cell_text)));
        Some(match caption {
            Some(c) => table.with_caption(c),
            None => table,
        })
    }
}

impl PageDecoder for JsonDecoder {
    fn name(&self) -> &str {
        "json"
    }

    fn mime_types(&self) -> &[&str] {
        &["application/json"]
    }

    fn decode(&self, doc: &SourceDocument, _options: &ExtractOptions) -> Result<DecodedDocument> {
        let set: PageSet = serde_json::from_slice(&doc.bytes).map_err(|e| Error::DocumentParse {
            document: doc.name.clone(),
            reason: format!("invalid page JSON: {}", e),
        })?;
        let pages = match set {
            PageSet::Wrapped { pages } | PageSet::Bare(pages) => pages,
        };

        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let tables = p
                    .tables
                    .into_iter()
                    .filter_map(JsonTable::into_table)
                    .map(|t| PageTable::new(t, None))
                    .collect();
                RawPage {
                    number: p.page.unwrap_or(i as u32 + 1),
                    text: p.text,
                    tables,
                    context: PageContext {
                        handwritten_notes: p.handwritten_notes,
                        ocr_quality: p.ocr_quality,
                    },
                }
            })
            .collect();

        Ok(DecodedDocument {
            name: doc.name.clone(),
            mime: "application/json".to_string(),
            pages,
            warnings: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<DecodedDocument> {
        JsonDecoder::new().decode(
            &SourceDocument::new("pages.json", json),
            &ExtractOptions::default(),
        )
    }

    #[test]
    fn test_wrapped_pages_with_tables() {
        let decoded = decode(
            r#"{"pages": [
                {"page": 3, "text": "WINDOW SCHEDULE", "handwritten_notes": true,
                 "tables": [{"caption": "WINDOW SCHEDULE", "rows": [["MARK", "QTY"], ["W1", 4]]}]}
            ]}"#,
        )
        .unwrap();

        let page = &decoded.pages[0];
        assert_eq!(page.number, 3);
        assert!(page.context.handwritten_notes);
        let table = &page.tables[0].table;
        assert_eq!(table.caption.as_deref(), Some("WINDOW SCHEDULE"));
        assert_eq!(table.body()[0].cells, vec!["W1", "4"]);
    }

    #[test]
    fn test_bare_array_and_ocr_quality() {
        let decoded = decode(
            r#"[{"text": "FLOOR PLAN", "ocr_quality": "poor"},
                {"text": "DOOR SCHEDULE", "tables": [[["MARK", "QTY"], ["D1", null]]]}]"#,
        )
        .unwrap();

        assert_eq!(decoded.pages.len(), 2);
        assert_eq!(decoded.pages[0].context.ocr_quality, OcrQuality::Poor);
        assert_eq!(decoded.pages[1].number, 2);
        assert_eq!(decoded.pages[1].tables[0].table.body()[0].cells[1], "");
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        assert!(matches!(
            decode("{\"pages\": 7}"),
            Err(Error::DocumentParse { .. })
        ));
    }
}
