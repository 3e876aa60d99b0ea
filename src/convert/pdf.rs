//! PDF plan sets.
//!
//! Each page's content stream is walked into positioned spans. Spans are
//! grouped into lines for the page text and handed to the table detector
//! for schedules. Pages that yield no spans (Type3 fonts, unusual encodings)
//! fall back to lopdf's own text extraction, laid out like plain text.

use super::text::TextDecoder;
use super::{detect_tables, DecodedDocument, PageDecoder, RawPage, SourceDocument};
use crate::error::{Error, Result};
use crate::parser::backend::{LopdfBackend, PageId, PdfBackend};
use crate::parser::layout::{group_into_lines, SpanExtractor, TextLine};
use crate::parser::table_detector::TableDetector;
use crate::parser::{ErrorMode, ExtractOptions};

/// Decoder for `application/pdf` documents.
#[derive(Debug, Default)]
pub struct PdfDecoder;

impl PdfDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode every page of an already loaded backend.
    pub fn decode_backend<B: PdfBackend>(
        &self,
        name: &str,
        backend: &B,
        options: &ExtractOptions,
    ) -> Result<DecodedDocument> {
        let detector = TableDetector::with_config(options.pdf_tables.clone());
        let text_detector = TableDetector::with_config(options.text_tables.clone());
        let extractor = SpanExtractor::new(backend);

        let mut decoded = DecodedDocument {
            name: name.to_string(),
            mime: "application/pdf".to_string(),
            ..Default::default()
        };

        for (number, page_id) in backend.pages() {
            match Self::decode_page(backend, &extractor, number, page_id, &detector, &text_detector) {
                Ok(page) => decoded.pages.push(page),
                Err(e) => match options.error_mode {
                    ErrorMode::Strict => {
                        return Err(Error::DocumentParse {
                            document: name.to_string(),
                            reason: format!("page {}: {}", number, e),
                        })
                    }
                    ErrorMode::Lenient => {
                        log::warn!("Skipping page {} of '{}': {}", number, name, e);
                        decoded.warnings.push(format!("page {}: {}", number, e));
                    }
                },
            }
        }

        Ok(decoded)
    }

    fn decode_page<B: PdfBackend>(
        backend: &B,
        extractor: &SpanExtractor<'_, B>,
        number: u32,
        page_id: PageId,
        detector: &TableDetector,
        text_detector: &TableDetector,
    ) -> Result<RawPage> {
        let spans = extractor.extract(page_id)?;

        if spans.iter().all(|s| s.text.trim().is_empty()) {
            return Ok(match backend.fallback_text(number) {
                Some(text) => {
                    log::debug!("Page {} has no positioned text, using fallback", number);
                    TextDecoder::decode_page(number, &text, text_detector)
                }
                None => RawPage::new(number, ""),
            });
        }

        let lines = group_into_lines(&spans, detector.config().y_tolerance_factor);
        let text = lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n");

        let tables = detect_tables(spans, detector, |top_y| nearest_line(&lines, top_y));

        Ok(RawPage {
            number,
            text,
            tables,
            ..Default::default()
        })
    }
}

/// Index of the line whose baseline is closest to `y`.
fn nearest_line(lines: &[TextLine], y: f32) -> usize {
    lines
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (a.y - y)
                .abs()
                .partial_cmp(&(b.y - y).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

impl PageDecoder for PdfDecoder {
    fn name(&self) -> &str {
        "pdf"
    }

    fn mime_types(&self) -> &[&str] {
        &["application/pdf"]
    }

    fn decode(&self, doc: &SourceDocument, options: &ExtractOptions) -> Result<DecodedDocument> {
        let backend = LopdfBackend::load_bytes(&doc.bytes).map_err(|e| Error::DocumentParse {
            document: doc.name.clone(),
            reason: e.to_string(),
        })?;
        log::debug!("'{}': {} pages", doc.name, backend.page_count());
        self.decode_backend(&doc.name, &backend, options)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::parser::backend::{ContentOp, PdfValue};

    /// Page 1 draws a schedule, page 2 fails, page 3 has no positioned text.
    struct SetBackend;

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp::new(operator, operands)
    }

    fn show(text: &str, x: i64, y: i64) -> Vec<ContentOp> {
        vec![
            op("Tm", vec![
                PdfValue::Integer(1),
                PdfValue::Integer(0),
                PdfValue::Integer(0),
                PdfValue::Integer(1),
                PdfValue::Integer(x),
                PdfValue::Integer(y),
            ]),
            op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())]),
        ]
    }

    impl PdfBackend for SetBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            (1..=3).map(|n| (n, (n, 0))).collect()
        }

        fn page_operations(&self, page: PageId) -> Result<Vec<ContentOp>> {
            match page.0 {
                1 => {
                    let mut ops = vec![
                        op("BT", vec![]),
                        op("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Integer(10)]),
                    ];
                    ops.extend(show("DOOR SCHEDULE", 72, 720));
                    for (i, (mark, qty)) in [("MARK", "QTY"), ("D1", "3"), ("D2", "1")].iter().enumerate() {
                        let y = 690 - 20 * i as i64;
                        ops.extend(show(mark, 72, y));
                        ops.extend(show(qty, 200, y));
                    }
                    ops.push(op("ET", vec![]));
                    Ok(ops)
                }
                2 => Err(Error::PdfParse("bad stream".to_string())),
                _ => Ok(Vec::new()),
            }
        }

        fn decode_text(&self, _page: PageId, _font: &[u8], bytes: &[u8]) -> String {
            String::from_utf8_lossy(bytes).into_owned()
        }

        fn fallback_text(&self, page_number: u32) -> Option<String> {
            (page_number == 3).then(|| "E-101 ELECTRICAL PLAN".to_string())
        }
    }

    #[test]
    fn test_lenient_skips_failed_page() {
        let options = ExtractOptions::default().lenient();
        let decoded = PdfDecoder::new()
            .decode_backend("set.pdf", &SetBackend, &options)
            .unwrap();

        let numbers: Vec<u32> = decoded.pages.iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(decoded.warnings.len(), 1);

        let first = &decoded.pages[0];
        assert!(first.text.starts_with("DOOR SCHEDULE"));
        assert_eq!(first.tables.len(), 1);
        assert_eq!(first.tables[0].line, Some(1));
        assert_eq!(first.tables[0].table.body().len(), 2);

        assert_eq!(decoded.pages[1].text, "E-101 ELECTRICAL PLAN");
    }

    #[test]
    fn test_strict_fails_document() {
        let result = PdfDecoder::new().decode_backend("set.pdf", &SetBackend, &ExtractOptions::default());
        assert!(matches!(result, Err(Error::DocumentParse { .. })));
    }

    #[test]
    fn test_garbage_bytes_are_document_error() {
        let doc = SourceDocument::new("broken.pdf", b"%PDF-1.7 not really".to_vec());
        let result = PdfDecoder::new().decode(&doc, &ExtractOptions::default());
        assert!(matches!(result, Err(Error::DocumentParse { .. })));
    }
}
