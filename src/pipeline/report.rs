//! Run requests, results and reliability reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::Stage;
use crate::convert::SourceDocument;
use crate::error::Diagnostic;
use crate::model::{Estimate, FactorSource, Jurisdiction, LocationKey, PlanGraph, SpecTier};
use crate::rules::ComplianceReport;

/// Inputs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub documents: Vec<SourceDocument>,
    pub jurisdiction: Jurisdiction,
    pub location: LocationKey,
    pub spec_tier: SpecTier,
}

impl RunRequest {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    pub fn with_jurisdiction(mut self, jurisdiction: Jurisdiction) -> Self {
        self.jurisdiction = jurisdiction;
        self
    }

    pub fn with_location(mut self, location: LocationKey) -> Self {
        self.location = location;
        self
    }

    pub fn with_spec_tier(mut self, tier: SpecTier) -> Self {
        self.spec_tier = tier;
        self
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub plan_graph: PlanGraph,
    pub compliance: ComplianceReport,
    pub estimate: Estimate,
    pub reliability: ReliabilityReport,
    pub completed_at: DateTime<Utc>,
}

/// What in a run was produced under degraded confidence or fallback data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    /// `document p<page> <category> row <n>` of each Low quantity
    pub low_confidence_quantities: Vec<String>,
    /// `<wbs> <description>` of each line item needing an RFI
    pub rfi_line_items: Vec<String>,
    /// Line items priced with the placeholder unit cost
    pub placeholder_lines: Vec<String>,
    pub failed_documents: Vec<String>,
    pub failed_packs: Vec<String>,
    pub neutral_regional_fallback: bool,
}

impl ReliabilityReport {
    /// Collect from whatever parts of a run exist.
    pub fn build(
        graph: Option<&PlanGraph>,
        compliance: Option<&ComplianceReport>,
        estimate: Option<&Estimate>,
    ) -> Self {
        let mut report = Self::default();
        if let Some(graph) = graph {
            report.low_confidence_quantities = graph
                .review_queue()
                .map(|q| format!("{} p{} {} row {}", q.document, q.page, q.category, q.row + 1))
                .collect();
            report.failed_documents = graph
                .document_errors
                .iter()
                .map(|d| d.subject.clone())
                .collect();
        }
        if let Some(compliance) = compliance {
            report.failed_packs = compliance.errors.iter().map(|d| d.subject.clone()).collect();
        }
        if let Some(estimate) = estimate {
            let label = |li: &crate::model::LineItem| format!("{} {}", li.wbs, li.description);
            report.rfi_line_items = estimate.rfi_lines().map(label).collect();
            report.placeholder_lines = estimate
                .line_items
                .iter()
                .filter(|li| li.is_fallback())
                .map(label)
                .collect();
            report.neutral_regional_fallback =
                estimate.regional_factor.source == FactorSource::Neutral;
        }
        report
    }

    /// True when nothing was degraded.
    pub fn is_clean(&self) -> bool {
        self.low_confidence_quantities.is_empty()
            && self.rfi_line_items.is_empty()
            && self.placeholder_lines.is_empty()
            && self.failed_documents.is_empty()
            && self.failed_packs.is_empty()
            && !self.neutral_regional_fallback
    }
}

/// Final state of a run.
///
/// `result` is set only when `status` is [`Stage::Complete`]. A failed run
/// keeps the plan graph when extraction finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: Stage,
    /// Last working stage entered
    pub stage: Stage,
    pub result: Option<RunResult>,
    pub plan_graph: Option<PlanGraph>,
    pub error: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub reliability: ReliabilityReport,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == Stage::Complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == Stage::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    #[test]
    fn test_empty_report_is_clean() {
        assert!(ReliabilityReport::build(None, None, None).is_clean());
    }

    #[test]
    fn test_failed_documents_listed() {
        let mut graph = PlanGraph::new();
        graph.document_errors.push(Diagnostic::new(
            DiagnosticKind::DocumentParse,
            "S-201.pdf",
            "truncated",
        ));
        let report = ReliabilityReport::build(Some(&graph), None, None);
        assert_eq!(report.failed_documents, vec!["S-201.pdf"]);
        assert!(!report.is_clean());
    }
}
