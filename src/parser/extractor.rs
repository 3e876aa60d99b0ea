//! Plan graph construction.
//!
//! Extraction runs in two passes. The first decodes every document (in
//! parallel when enabled), classifies pages and reads schedule rows. The
//! second scores each row against the whole set, since corroboration and
//! contradictions depend on the other pages.

use std::collections::HashSet;
use std::sync::Arc;

use rayon::prelude::*;

use super::classify::{
    category_named_in, classify_discipline, detect_schedules, extract_dimensions,
    schedule_header_lines,
};
use super::options::ExtractOptions;
use super::quantities::{classify_row, read_rows, ColumnMap, RowReading};
use crate::convert::{DecodedDocument, DecoderRegistry, PageTable, RawPage, SourceDocument};
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::model::{
    ConfidenceSummary, OcrQuality, PageContext, PlanGraph, Quantity, QuantitySignals,
    QuantitySource, RfiItem, ScheduleCapture, ScheduleCategory, Sheet,
};

/// Turns plan documents into a [`PlanGraph`].
#[derive(Clone)]
pub struct QuantityExtractor {
    options: ExtractOptions,
    registry: Arc<DecoderRegistry>,
}

/// A schedule row waiting for set-wide scoring.
struct PendingRow {
    category: ScheduleCategory,
    document: String,
    page: u32,
    /// Document index, page number and table index of the source table
    capture: (usize, u32, usize),
    context: PageContext,
    reading: RowReading,
}

impl QuantityExtractor {
    /// Create an extractor with the built-in decoders.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            registry: Arc::new(DecoderRegistry::with_defaults()),
        }
    }

    /// Use a custom decoder registry.
    pub fn with_registry(mut self, registry: Arc<DecoderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Decode all documents, keeping input order.
    pub fn decode(&self, documents: &[SourceDocument]) -> Vec<Result<DecodedDocument>> {
        let decode_one = |doc: &SourceDocument| {
            let result = self.registry.decode(doc, &self.options);
            if let Err(ref e) = result {
                log::warn!("Failed to decode '{}': {}", doc.name, e);
            }
            result
        };

        if self.options.parallel && documents.len() > 1 {
            documents.par_iter().map(decode_one).collect()
        } else {
            documents.iter().map(decode_one).collect()
        }
    }

    /// Decode and extract in one step.
    pub fn extract(&self, documents: &[SourceDocument]) -> PlanGraph {
        let decoded = self.decode(documents);
        let named = documents
            .iter()
            .map(|d| d.name.clone())
            .zip(decoded)
            .collect();
        self.build_graph(named)
    }

    /// Build the plan graph from decode results, one per input document.
    ///
    /// Failed documents are skipped and recorded as diagnostics.
    pub fn build_graph(&self, decoded: Vec<(String, Result<DecodedDocument>)>) -> PlanGraph {
        let mut graph = PlanGraph::new();
        graph.metadata.total_files = decoded.len();

        let mut pending = Vec::new();
        let mut page_tokens: Vec<((usize, u32), HashSet<String>)> = Vec::new();

        for (doc_idx, (name, result)) in decoded.into_iter().enumerate() {
            let doc = match result {
                Ok(doc) => doc,
                Err(e) => {
                    graph.metadata.failed_documents += 1;
                    graph
                        .document_errors
                        .push(Diagnostic::from_error(DiagnosticKind::DocumentParse, &name, &e));
                    continue;
                }
            };
            for warning in &doc.warnings {
                log::warn!("'{}': {}", doc.name, warning);
            }

            for page in &doc.pages {
                graph.metadata.total_pages += 1;
                page_tokens.push(((doc_idx, page.number), mark_tokens(&page.text)));
                self.read_page(&mut graph, &mut pending, doc_idx, &doc.name, page);
            }
        }

        graph.quantities = score_rows(&pending, &page_tokens);
        graph.rfi_items = graph
            .quantities
            .iter()
            .filter(|q| q.needs_manual_review())
            .map(RfiItem::for_quantity)
            .collect();
        graph.metadata.confidence_summary = ConfidenceSummary::from_quantities(&graph.quantities);

        log::debug!(
            "Extracted {} quantities from {} pages ({} low confidence)",
            graph.quantities.len(),
            graph.metadata.total_pages,
            graph.metadata.confidence_summary.low
        );
        graph
    }

    fn read_page(
        &self,
        graph: &mut PlanGraph,
        pending: &mut Vec<PendingRow>,
        doc_idx: usize,
        document: &str,
        page: &RawPage,
    ) {
        let context = self.page_context(page);

        graph.sheets.push(Sheet {
            file: document.to_string(),
            page: page.number,
            discipline: classify_discipline(&page.text),
            dimensions: extract_dimensions(&page.text),
            text_excerpt: page.text.chars().take(self.options.excerpt_chars).collect(),
        });

        let captions: Vec<&str> = page
            .tables
            .iter()
            .filter_map(|t| t.table.caption.as_deref())
            .collect();
        let categories = detect_schedules(&format!("{}\n{}", page.text, captions.join("\n")));
        if categories.is_empty() {
            return;
        }

        let mut captures: Vec<ScheduleCapture> = categories
            .iter()
            .map(|_| ScheduleCapture {
                document: document.to_string(),
                page: page.number,
                raw_text: page.text.clone(),
                tables: Vec::new(),
            })
            .collect();

        let headers = schedule_header_lines(&page.text);
        for (table_idx, page_table) in page.tables.iter().enumerate() {
            let category = attribute_table(page_table, &categories, &headers);
            let slot = categories.iter().position(|c| *c == category).unwrap_or(0);
            captures[slot].tables.push(page_table.table.clone());

            let Some(columns) = ColumnMap::locate(&page_table.table) else {
                log::debug!(
                    "{} page {}: {} table has no quantity column",
                    document,
                    page.number,
                    category
                );
                continue;
            };
            for reading in read_rows(&page_table.table, &columns, category) {
                pending.push(PendingRow {
                    category,
                    document: document.to_string(),
                    page: page.number,
                    capture: (doc_idx, page.number, table_idx),
                    context,
                    reading,
                });
            }
        }

        for (category, capture) in categories.into_iter().zip(captures) {
            graph.schedules.entry(category).or_default().push(capture);
        }
    }

    /// Page context, flagging poor OCR from replacement characters.
    fn page_context(&self, page: &RawPage) -> PageContext {
        let mut context = page.context;
        let total = page.text.chars().count();
        if total > 0 {
            let replaced = page.text.chars().filter(|c| *c == '\u{FFFD}').count();
            if replaced as f32 / total as f32 > self.options.poor_ocr_ratio {
                context.ocr_quality = OcrQuality::Poor;
            }
        }
        context
    }
}

impl Default for QuantityExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

/// Pick the one category a table belongs to.
fn attribute_table(
    table: &PageTable,
    categories: &[ScheduleCategory],
    headers: &[(usize, ScheduleCategory)],
) -> ScheduleCategory {
    let mut label = table.table.caption.clone().unwrap_or_default();
    label.push('\n');
    label.push_str(&table.table.header_cells().join(" "));
    if let Some(named) = category_named_in(&label, categories) {
        return named;
    }

    if let Some(line) = table.line {
        let nearest = headers
            .iter()
            .filter(|(idx, c)| *idx <= line && categories.contains(c))
            .max_by_key(|(idx, _)| *idx);
        if let Some((_, category)) = nearest {
            return *category;
        }
    }

    categories[0]
}

/// Upper-cased word tokens of a page, used for mark cross-references.
fn mark_tokens(text: &str) -> HashSet<String> {
    text.to_uppercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '.'))
        .map(|t| t.trim_matches(|c| c == '.' || c == '-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Marks short or purely numeric would cross-reference by accident.
fn is_referable_mark(mark: &str) -> bool {
    mark.chars().count() >= 2 && mark.chars().any(|c| c.is_alphabetic())
}

fn score_rows(pending: &[PendingRow], page_tokens: &[((usize, u32), HashSet<String>)]) -> Vec<Quantity> {
    pending
        .iter()
        .map(|row| {
            let mark = row.reading.mark.as_deref().map(str::to_uppercase);
            let same_mark: Vec<&PendingRow> = match &mark {
                Some(m) => pending
                    .iter()
                    .filter(|other| {
                        !std::ptr::eq(*other, row)
                            && other.category == row.category
                            && other.reading.mark.as_deref().map(str::to_uppercase).as_deref() == Some(m.as_str())
                    })
                    .collect(),
                None => Vec::new(),
            };

            let mut corroboration = 1;
            if let Some(m) = mark.as_deref().filter(|m| is_referable_mark(m)) {
                let own_page = (row.capture.0, row.capture.1);
                if page_tokens
                    .iter()
                    .any(|(key, tokens)| *key != own_page && tokens.contains(m))
                {
                    corroboration += 1;
                }
            }
            if same_mark
                .iter()
                .any(|o| o.capture != row.capture && o.reading.value == row.reading.value)
            {
                corroboration += 1;
            }

            let contradicts = row.reading.value < 0.0
                || same_mark.iter().any(|o| o.reading.value != row.reading.value);

            let signals = QuantitySignals {
                source: QuantitySource::ScheduleTable,
                has_qty_column: true,
                corroboration_count: corroboration,
                has_dimensions: row.reading.has_dimensions,
                has_qty_callout: true,
                has_unit_of_measure: row.reading.uom.is_some(),
                is_inferred: false,
                has_contradictions: contradicts,
            };

            let class = classify_row(row.category, row.reading.description.as_deref());
            let mut quantity = Quantity::new(
                row.category.as_str(),
                row.document.clone(),
                row.page,
                row.reading.value,
                signals,
                &row.context,
            )
            .with_uom(row.reading.uom.clone())
            .with_classification(class.trade, class.wbs, class.assembly, class.item);
            quantity.row = row.reading.row;
            quantity.mark = row.reading.mark.clone();
            quantity.description = row.reading.description.clone();
            quantity.alt_group = row.reading.alt_group.clone();
            quantity
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Confidence, Table};

    fn page(number: u32, text: &str, tables: Vec<PageTable>) -> RawPage {
        RawPage {
            number,
            text: text.to_string(),
            tables,
            ..Default::default()
        }
    }

    fn doc(name: &str, pages: Vec<RawPage>) -> (String, Result<DecodedDocument>) {
        (
            name.to_string(),
            Ok(DecodedDocument {
                name: name.to_string(),
                mime: "application/json".to_string(),
                pages,
                warnings: vec![],
            }),
        )
    }

    fn table(rows: Vec<Vec<&str>>, line: Option<usize>) -> PageTable {
        PageTable::new(Table::from_rows(rows), line)
    }

    #[test]
    fn test_failed_document_is_recorded() {
        let extractor = QuantityExtractor::default();
        let graph = extractor.build_graph(vec![
            ("bad.pdf".to_string(), Err(Error::PdfParse("truncated".to_string()))),
            doc("A-101.pdf", vec![page(1, "FLOOR PLAN", vec![])]),
        ]);

        assert_eq!(graph.metadata.total_files, 2);
        assert_eq!(graph.metadata.failed_documents, 1);
        assert_eq!(graph.document_errors[0].subject, "bad.pdf");
        assert_eq!(graph.sheets.len(), 1);
        assert!(graph.quantities.is_empty());
    }

    #[test]
    fn test_multi_schedule_page_attribution() {
        let text = "WINDOW SCHEDULE\nMARK QTY\nW1 4\n\nDOOR SCHEDULE\nMARK QTY\nD1 3";
        let graph = QuantityExtractor::default().build_graph(vec![doc(
            "A-601.pdf",
            vec![page(
                1,
                text,
                vec![
                    table(vec![vec!["MARK", "QTY"], vec!["W1", "4"]], Some(1)),
                    table(vec![vec!["MARK", "QTY"], vec!["D1", "3"]], Some(5)),
                ],
            )],
        )]);

        let windows = graph.schedules_for(ScheduleCategory::Windows);
        let doors = graph.schedules_for(ScheduleCategory::Doors);
        assert_eq!(windows[0].tables.len(), 1);
        assert_eq!(doors[0].tables.len(), 1);
        assert_eq!(doors[0].tables[0].body()[0].cells[0], "D1");

        let categories: Vec<&str> = graph.quantities.iter().map(|q| q.category.as_str()).collect();
        assert_eq!(categories, vec!["windows", "doors"]);
        assert!(graph.schedules_for(ScheduleCategory::Finishes).is_empty());
    }

    #[test]
    fn test_cross_reference_raises_confidence() {
        let schedule = page(
            2,
            "DOOR SCHEDULE",
            vec![table(vec![vec!["MARK", "QTY"], vec!["D1", "3"], vec!["D7", "1"]], Some(1))],
        );
        let plan = page(1, "FLOOR PLAN  SEE D1 AT ENTRY", vec![]);
        let graph = QuantityExtractor::default().build_graph(vec![doc("set.pdf", vec![plan, schedule])]);

        assert_eq!(graph.quantities[0].signals.corroboration_count, 2);
        assert_eq!(graph.quantities[0].confidence(), Confidence::High);
        assert_eq!(graph.quantities[1].confidence(), Confidence::Medium);
        assert!(graph.rfi_items.is_empty());
    }

    #[test]
    fn test_contradiction_and_poor_ocr_are_low() {
        let doors = page(
            1,
            "DOOR SCHEDULE",
            vec![table(vec![vec!["MARK", "QTY"], vec!["D1", "3"], vec!["D1", "2"]], Some(1))],
        );
        let noisy_text = format!("WINDOW SCHEDULE {}", "\u{FFFD}".repeat(3));
        let windows = page(2, &noisy_text, vec![table(vec![vec!["MARK", "QTY"], vec!["W9", "2"]], None)]);
        let graph = QuantityExtractor::default().build_graph(vec![doc("set.pdf", vec![doors, windows])]);

        assert!(graph.quantities.iter().all(|q| q.confidence() == Confidence::Low));
        assert!(graph.quantities[0].signals.has_contradictions);
        assert_eq!(graph.rfi_items.len(), 3);
        assert_eq!(
            graph.rfi_items[2].suggested_question,
            "Please verify quantity for windows on page 2"
        );
        assert_eq!(graph.metadata.confidence_summary.low, 3);
    }

    #[test]
    fn test_sized_row_is_high_without_corroboration() {
        let windows = page(
            1,
            "WINDOW SCHEDULE",
            vec![table(
                vec![
                    vec!["MARK", "SIZE", "QTY"],
                    vec!["W1", "3'-0\"x5'-0\"", "4"],
                    vec!["W2", "", "2"],
                ],
                Some(1),
            )],
        );
        let graph = QuantityExtractor::default().build_graph(vec![doc("A-601.pdf", vec![windows])]);

        let sized = &graph.quantities[0];
        assert_eq!(sized.signals.corroboration_count, 1);
        assert!(sized.signals.has_dimensions && sized.signals.has_qty_callout);
        assert_eq!(sized.confidence(), Confidence::High);
        assert_eq!(graph.quantities[1].confidence(), Confidence::Medium);
    }

    #[test]
    fn test_excerpt_length() {
        let extractor = QuantityExtractor::new(ExtractOptions::default().with_excerpt_chars(5));
        let graph = extractor.build_graph(vec![doc("a.pdf", vec![page(1, "ELECTRICAL PLAN", vec![])])]);
        assert_eq!(graph.sheets[0].text_excerpt, "ELECT");
    }
}
