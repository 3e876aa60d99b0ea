//! Quantity records and confidence scoring inputs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Confidence tier attached to every extracted quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Low-confidence quantities need a human to verify them.
    pub fn needs_manual_review(self) -> bool {
        self == Confidence::Low
    }

    /// Label used in RFI text.
    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a quantity was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantitySource {
    /// A row of a detected schedule table
    #[default]
    ScheduleTable,
    /// A free-text callout on a sheet
    Callout,
}

/// OCR quality reported for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrQuality {
    Fair,
    #[serde(alias = "Poor", alias = "POOR")]
    Poor,
    /// Also used for unrecognized quality labels
    #[default]
    #[serde(other)]
    Good,
}

/// Page-level conditions that affect confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageContext {
    /// The page carries handwritten annotations
    #[serde(default)]
    pub handwritten_notes: bool,
    /// Quality of the text layer
    #[serde(default)]
    pub ocr_quality: OcrQuality,
}

impl PageContext {
    /// True when the page text cannot be trusted as-is.
    pub fn is_degraded(&self) -> bool {
        self.handwritten_notes || self.ocr_quality == OcrQuality::Poor
    }
}

/// Evidence gathered for one quantity, scored by [`QuantitySignals::assess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuantitySignals {
    pub source: QuantitySource,
    pub has_qty_column: bool,
    /// Number of independent data points agreeing on the value
    pub corroboration_count: u32,
    pub has_dimensions: bool,
    pub has_qty_callout: bool,
    pub has_unit_of_measure: bool,
    pub is_inferred: bool,
    pub has_contradictions: bool,
}

impl QuantitySignals {
    /// Score the signals. The checks run in a fixed order and the first match wins.
    pub fn assess(&self, page: &PageContext) -> Confidence {
        if self.source == QuantitySource::ScheduleTable
            && self.has_qty_column
            && self.corroboration_count > 1
        {
            return Confidence::High;
        }
        if self.has_dimensions && self.has_qty_callout {
            return Confidence::High;
        }
        if self.is_inferred || self.has_contradictions {
            return Confidence::Low;
        }
        if page.is_degraded() {
            return Confidence::Low;
        }
        if !self.has_unit_of_measure {
            return Confidence::Low;
        }
        Confidence::Medium
    }
}

/// A buildable quantity extracted from a plan set.
///
/// `needs_manual_review` is derived from the confidence tier and is
/// recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "QuantityRecord")]
pub struct Quantity {
    /// Schedule category (e.g. "windows")
    pub category: String,
    /// Source document name
    pub document: String,
    /// 1-based page number
    pub page: u32,
    /// Zero-based body row within the schedule table
    pub row: usize,
    pub value: f64,
    pub uom: Option<String>,
    confidence: Confidence,
    needs_manual_review: bool,
    pub trade: String,
    pub wbs: String,
    pub assembly: String,
    /// Catalog item name used for price lookup
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_group: Option<String>,
    pub signals: QuantitySignals,
}

impl Quantity {
    /// Create a quantity, scoring its confidence from the signals.
    pub fn new(
        category: impl Into<String>,
        document: impl Into<String>,
        page: u32,
        value: f64,
        signals: QuantitySignals,
        context: &PageContext,
    ) -> Self {
        let confidence = signals.assess(context);
        Self {
            category: category.into(),
            document: document.into(),
            page,
            row: 0,
            value,
            uom: None,
            confidence,
            needs_manual_review: confidence.needs_manual_review(),
            trade: String::new(),
            wbs: String::new(),
            assembly: String::new(),
            item: String::new(),
            mark: None,
            description: None,
            alt_group: None,
            signals,
        }
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn needs_manual_review(&self) -> bool {
        self.needs_manual_review
    }

    /// Set the unit of measure and return self.
    pub fn with_uom(mut self, uom: Option<String>) -> Self {
        self.uom = uom;
        self
    }

    /// Set trade, WBS code, assembly and catalog item.
    pub fn with_classification(
        mut self,
        trade: impl Into<String>,
        wbs: impl Into<String>,
        assembly: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        self.trade = trade.into();
        self.wbs = wbs.into();
        self.assembly = assembly.into();
        self.item = item.into();
        self
    }
}

/// Wire shape of [`Quantity`]; the review flag is derived, not trusted.
#[derive(Deserialize)]
struct QuantityRecord {
    category: String,
    #[serde(default)]
    document: String,
    page: u32,
    #[serde(default)]
    row: usize,
    value: f64,
    #[serde(default)]
    uom: Option<String>,
    confidence: Confidence,
    #[serde(default)]
    trade: String,
    #[serde(default)]
    wbs: String,
    #[serde(default)]
    assembly: String,
    #[serde(default)]
    item: String,
    #[serde(default)]
    mark: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_group: Option<String>,
    #[serde(default)]
    signals: QuantitySignals,
}

impl From<QuantityRecord> for Quantity {
    fn from(r: QuantityRecord) -> Self {
        Self {
            category: r.category,
            document: r.document,
            page: r.page,
            row: r.row,
            value: r.value,
            uom: r.uom,
            confidence: r.confidence,
            needs_manual_review: r.confidence.needs_manual_review(),
            trade: r.trade,
            wbs: r.wbs,
            assembly: r.assembly,
            item: r.item,
            mark: r.mark,
            description: r.description,
            alt_group: r.alt_group,
            signals: r.signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_signals(corroboration: u32) -> QuantitySignals {
        QuantitySignals {
            source: QuantitySource::ScheduleTable,
            has_qty_column: true,
            corroboration_count: corroboration,
            has_unit_of_measure: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_corroborated_schedule_row_is_high() {
        let signals = table_signals(2);
        assert_eq!(signals.assess(&PageContext::default()), Confidence::High);
    }

    #[test]
    fn test_single_source_schedule_row_is_medium() {
        let signals = table_signals(1);
        assert_eq!(signals.assess(&PageContext::default()), Confidence::Medium);
    }

    #[test]
    fn test_dimension_plus_callout_is_high() {
        let signals = QuantitySignals {
            source: QuantitySource::Callout,
            has_dimensions: true,
            has_qty_callout: true,
            ..Default::default()
        };
        assert_eq!(signals.assess(&PageContext::default()), Confidence::High);
    }

    #[test]
    fn test_high_rule_wins_over_degraded_page() {
        let signals = table_signals(3);
        let page = PageContext {
            handwritten_notes: true,
            ocr_quality: OcrQuality::Poor,
        };
        assert_eq!(signals.assess(&page), Confidence::High);
    }

    #[test]
    fn test_low_conditions() {
        let page = PageContext::default();

        let inferred = QuantitySignals {
            is_inferred: true,
            ..table_signals(1)
        };
        assert_eq!(inferred.assess(&page), Confidence::Low);

        let contradictory = QuantitySignals {
            has_contradictions: true,
            ..table_signals(1)
        };
        assert_eq!(contradictory.assess(&page), Confidence::Low);

        let handwritten = PageContext {
            handwritten_notes: true,
            ..Default::default()
        };
        assert_eq!(table_signals(1).assess(&handwritten), Confidence::Low);

        let poor = PageContext {
            ocr_quality: OcrQuality::Poor,
            ..Default::default()
        };
        assert_eq!(table_signals(1).assess(&poor), Confidence::Low);

        let no_uom = QuantitySignals {
            has_unit_of_measure: false,
            ..table_signals(1)
        };
        assert_eq!(no_uom.assess(&page), Confidence::Low);
    }

    #[test]
    fn test_review_flag_tracks_confidence() {
        let page = PageContext::default();
        let low = Quantity::new("windows", "A.pdf", 1, 4.0, QuantitySignals::default(), &page);
        assert_eq!(low.confidence(), Confidence::Low);
        assert!(low.needs_manual_review());

        let medium = Quantity::new("windows", "A.pdf", 1, 4.0, table_signals(1), &page);
        assert!(!medium.needs_manual_review());
    }

    #[test]
    fn test_unknown_ocr_quality_reads_as_good() {
        let page: PageContext = serde_json::from_str(r#"{"ocr_quality": "excellent"}"#).unwrap();
        assert_eq!(page.ocr_quality, OcrQuality::Good);
        let page: PageContext = serde_json::from_str(r#"{"ocr_quality": "POOR"}"#).unwrap();
        assert!(page.is_degraded());
    }

    #[test]
    fn test_deserialize_recomputes_review_flag() {
        let json = r#"{
            "category": "doors",
            "page": 2,
            "value": 3.0,
            "confidence": "Low",
            "needs_manual_review": false
        }"#;
        let qty: Quantity = serde_json::from_str(json).unwrap();
        assert_eq!(qty.confidence(), Confidence::Low);
        assert!(qty.needs_manual_review());
    }
}
