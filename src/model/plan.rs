//! Plan graph: the structured result of one extraction run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::quantity::{Confidence, Quantity};
use super::table::Table;
use crate::error::Diagnostic;

/// Schedule categories recognised on plan sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleCategory {
    Windows,
    Doors,
    Equipment,
    Finishes,
}

impl ScheduleCategory {
    /// All categories in detection order.
    pub const ALL: [ScheduleCategory; 4] = [
        ScheduleCategory::Windows,
        ScheduleCategory::Doors,
        ScheduleCategory::Equipment,
        ScheduleCategory::Finishes,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleCategory::Windows => "windows",
            ScheduleCategory::Doors => "doors",
            ScheduleCategory::Equipment => "equipment",
            ScheduleCategory::Finishes => "finishes",
        }
    }
}

impl fmt::Display for ScheduleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discipline tag of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetDiscipline {
    Structural,
    Architectural,
    Mechanical,
    Electrical,
    Plumbing,
    Site,
    #[default]
    Unknown,
}

impl SheetDiscipline {
    pub fn as_str(self) -> &'static str {
        match self {
            SheetDiscipline::Structural => "structural",
            SheetDiscipline::Architectural => "architectural",
            SheetDiscipline::Mechanical => "mechanical",
            SheetDiscipline::Electrical => "electrical",
            SheetDiscipline::Plumbing => "plumbing",
            SheetDiscipline::Site => "site",
            SheetDiscipline::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SheetDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A feet-and-inches dimension callout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Text as it appeared on the sheet
    pub raw: String,
    pub feet: u32,
    pub inches: u32,
    pub total_inches: u32,
}

impl Dimension {
    pub fn new(raw: impl Into<String>, feet: u32, inches: u32) -> Self {
        Self {
            raw: raw.into(),
            feet,
            inches,
            total_inches: feet * 12 + inches,
        }
    }
}

/// One page of a plan document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub file: String,
    pub page: u32,
    pub discipline: SheetDiscipline,
    pub dimensions: Vec<Dimension>,
    /// Leading characters of the page text
    pub text_excerpt: String,
}

/// A schedule section found on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCapture {
    pub document: String,
    pub page: u32,
    /// Full page text the schedule was found in
    pub raw_text: String,
    /// Tables attributed to this category
    pub tables: Vec<Table>,
}

/// A request for information raised for a low-confidence quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfiItem {
    pub quantity: Quantity,
    pub reason: String,
    pub suggested_question: String,
}

impl RfiItem {
    /// Build the RFI for a quantity.
    pub fn for_quantity(quantity: &Quantity) -> Self {
        Self {
            reason: format!(
                "Low confidence ({}) - requires manual verification",
                quantity.confidence()
            ),
            suggested_question: format!(
                "Please verify quantity for {} on page {}",
                quantity.category, quantity.page
            ),
            quantity: quantity.clone(),
        }
    }
}

/// Quantity counts per confidence tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceSummary {
    /// Count the tiers of a quantity list.
    pub fn from_quantities(quantities: &[Quantity]) -> Self {
        let mut summary = Self::default();
        for q in quantities {
            summary.add(q.confidence());
        }
        summary
    }

    pub fn add(&mut self, confidence: Confidence) {
        match confidence {
            Confidence::High => self.high += 1,
            Confidence::Medium => self.medium += 1,
            Confidence::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Run-level counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub total_files: usize,
    pub total_pages: usize,
    pub failed_documents: usize,
    pub confidence_summary: ConfidenceSummary,
}

/// Aggregate of one parse run. Built once, then shared read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanGraph {
    pub sheets: Vec<Sheet>,
    pub schedules: BTreeMap<ScheduleCategory, Vec<ScheduleCapture>>,
    pub quantities: Vec<Quantity>,
    pub rfi_items: Vec<RfiItem>,
    pub metadata: PlanMetadata,
    /// Documents that were skipped
    #[serde(default)]
    pub document_errors: Vec<Diagnostic>,
}

impl PlanGraph {
    /// Create an empty graph with every schedule category present.
    pub fn new() -> Self {
        Self {
            schedules: ScheduleCategory::ALL
                .iter()
                .map(|c| (*c, Vec::new()))
                .collect(),
            ..Default::default()
        }
    }

    /// Schedule captures for a category.
    pub fn schedules_for(&self, category: ScheduleCategory) -> &[ScheduleCapture] {
        self.schedules
            .get(&category)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Sheets tagged with a discipline.
    pub fn sheets_with(&self, discipline: SheetDiscipline) -> impl Iterator<Item = &Sheet> {
        self.sheets.iter().filter(move |s| s.discipline == discipline)
    }

    /// Quantities flagged for manual review.
    pub fn review_queue(&self) -> impl Iterator<Item = &Quantity> {
        self.quantities.iter().filter(|q| q.needs_manual_review())
    }
}
