//! # planscope
//!
//! Construction plan-to-estimate pipeline for Rust.
//!
//! This library reads plan sets (PDF, plain text, CSV or pre-extracted JSON),
//! extracts schedule quantities with confidence tiers, checks the set against
//! building-code rule packs, and prices the quantities into a regionally
//! adjusted estimate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use planscope::model::{Jurisdiction, LocationKey, SpecTier};
//! use planscope::SourceDocument;
//!
//! fn main() -> planscope::Result<()> {
//!     let documents = vec![SourceDocument::from_path("A-601.pdf")?];
//!     let graph = planscope::extract_plan_graph(&documents);
//!
//!     let report = planscope::check_compliance(&graph, &Jurisdiction::default());
//!     for finding in &report.findings {
//!         println!("{} {}", finding.code(), finding.code_citation);
//!     }
//!
//!     let estimate = planscope::estimate(&graph, &LocationKey::zip("30303"), SpecTier::Premium);
//!     println!("Grand total: {:.2}", estimate.summary.grand_total);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Pluggable decoders**: PDF (lopdf), text, CSV and JSON, keyed by MIME
//! - **Confidence scoring**: every quantity is High, Medium or Low, with RFIs for Low
//! - **Rule packs**: IRC 2018, IECC 2015, NEC 2017 and Georgia amendments
//! - **Regional pricing**: ZIP, CBSA and region factors over a JSON-loadable catalog
//! - **Async pipeline**: tokio orchestration with progress events and cancellation
//! - **Parallel processing**: Uses Rayon for multi-document plan sets

pub mod convert;
pub mod detect;
pub mod error;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod pricing;
pub mod render;
pub mod rules;

// Re-export commonly used types
pub use convert::{DecoderRegistry, PageDecoder, SourceDocument};
pub use detect::{detect_format, detect_format_from_bytes, is_pdf_bytes, DocumentFormat};
pub use error::{Diagnostic, DiagnosticKind, Error, Result};
pub use model::{
    Confidence, Estimate, Finding, Jurisdiction, LocationKey, PlanGraph, Quantity,
    RegionalFactor, Severity, SpecTier,
};
pub use parser::{ErrorMode, ExtractOptions, QuantityExtractor};
pub use pipeline::{Pipeline, RunOutcome, RunRequest, RunResult, Stage};
pub use pricing::{CostBook, PricingEngine, PricingOptions, RegionalFactorResolver, RegionalTable};
pub use render::JsonFormat;
pub use rules::{ComplianceReport, RuleEngine, RuleRegistry};

use std::path::Path;

/// Extract a plan graph with default options.
///
/// Documents that cannot be decoded are skipped and listed in
/// `graph.document_errors`.
pub fn extract_plan_graph(documents: &[SourceDocument]) -> PlanGraph {
    QuantityExtractor::default().extract(documents)
}

/// Read files from disk and extract a plan graph.
///
/// Fails only when a file cannot be read.
///
/// # Example
///
/// ```no_run
/// let graph = planscope::extract_files(&["A-101.pdf", "M-601.csv"]).unwrap();
/// println!("{} quantities", graph.quantities.len());
/// ```
pub fn extract_files<P: AsRef<Path>>(paths: &[P]) -> Result<PlanGraph> {
    let documents = paths
        .iter()
        .map(SourceDocument::from_path)
        .collect::<Result<Vec<_>>>()?;
    Ok(extract_plan_graph(&documents))
}

/// Evaluate the built-in rule packs for a jurisdiction.
pub fn check_compliance(graph: &PlanGraph, jurisdiction: &Jurisdiction) -> ComplianceReport {
    RuleEngine::default().evaluate(graph, jurisdiction)
}

/// Price a plan graph with the built-in catalog and regional tables.
///
/// Regional lookup misses are recorded in `estimate.diagnostics`.
pub fn estimate(graph: &PlanGraph, location: &LocationKey, tier: SpecTier) -> Estimate {
    let (factor, misses) = RegionalFactorResolver::default().resolve(location);
    let mut estimate = PricingEngine::default().price_graph(graph, &factor, tier);
    estimate.diagnostics.splice(0..0, misses);
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = "M-601 MECHANICAL\nEQUIPMENT SCHEDULE\n| MARK | DESCRIPTION | QTY | UOM |\n| AHU-1 | HVAC AIR HANDLER | 2 | EA |\n";

    #[test]
    fn test_extract_plan_graph() {
        let graph = extract_plan_graph(&[SourceDocument::new("M-601.txt", SCHEDULE)]);
        assert_eq!(graph.quantities.len(), 1);
        assert_eq!(graph.quantities[0].item, "HVAC");
        assert_eq!(graph.sheets[0].discipline, model::SheetDiscipline::Mechanical);
    }

    #[test]
    fn test_extract_files_missing() {
        let err = extract_files(&["/nonexistent/plan.pdf"]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_extract_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("M-601.txt");
        std::fs::write(&path, SCHEDULE).unwrap();
        let graph = extract_files(&[&path]).unwrap();
        assert_eq!(graph.metadata.total_files, 1);
        assert!(graph.document_errors.is_empty());
    }

    #[test]
    fn test_estimate_records_regional_miss() {
        let graph = extract_plan_graph(&[SourceDocument::new("M-601.txt", SCHEDULE)]);
        let estimate = estimate(&graph, &LocationKey::zip("00000"), SpecTier::Standard);
        assert_eq!(estimate.regional_factor, RegionalFactor::neutral());
        assert_eq!(estimate.line_items[0].ext_cost, 1840.0);
        assert!(estimate
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::RegionalLookupMiss));
    }

    #[test]
    fn test_check_compliance_default_jurisdiction() {
        let report = check_compliance(&PlanGraph::new(), &Jurisdiction::default());
        assert_eq!(report.activated_packs, vec!["IRC", "IECC", "NEC", "GA"]);
        assert!(report.findings.iter().all(|f| f.code.is_some()));
    }
}
