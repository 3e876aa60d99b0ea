//! Code-compliance rule engine.
//!
//! Rule packs are fixed lists of pure predicates over a [`PlanIndex`]. A pack
//! runs when its activation key matches the jurisdiction; each rule emits a
//! finding only when a required signal is absent from the plan set.
//!
//! # Example
//!
//! ```
//! use planscope::model::{Jurisdiction, PlanGraph};
//! use planscope::rules::RuleEngine;
//!
//! let engine = RuleEngine::default();
//! let report = engine.evaluate(&PlanGraph::new(), &Jurisdiction::new("TX", "IRC2018"));
//! assert_eq!(report.activated_packs, vec!["IRC"]);
//! ```

mod georgia;
mod iecc;
pub mod index;
mod irc;
mod nec;

pub use index::{IndexedSheet, PlanIndex};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Error};
use crate::model::{Finding, Jurisdiction, Severity};

/// A single compliance predicate.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub check: fn(&PlanIndex) -> Vec<Finding>,
}

impl Rule {
    pub const fn new(id: &'static str, check: fn(&PlanIndex) -> Vec<Finding>) -> Self {
        Self { id, check }
    }
}

/// When a pack applies to a jurisdiction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Token appears in the code-set string (case-insensitive)
    CodeToken(&'static str),
    /// State code equals the jurisdiction's state, or is a segment of the code set
    State(&'static str),
}

impl Activation {
    pub fn matches(&self, jurisdiction: &Jurisdiction) -> bool {
        let code_set = jurisdiction.code_set.to_uppercase();
        match self {
            Activation::CodeToken(token) => code_set.contains(&token.to_uppercase()),
            Activation::State(state) => {
                jurisdiction.state.trim().eq_ignore_ascii_case(state)
                    || code_set
                        .split(['_', ',', ' '])
                        .any(|segment| segment.trim() == state.to_uppercase())
            }
        }
    }
}

/// A named set of rules with one activation key.
#[derive(Debug, Clone, Copy)]
pub struct RulePack {
    pub id: &'static str,
    pub title: &'static str,
    pub activation: Activation,
    pub rules: &'static [Rule],
}

impl RulePack {
    /// Run every rule, tagging findings with the pack and rule ids.
    pub fn evaluate(&self, index: &PlanIndex) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in self.rules {
            for mut finding in (rule.check)(index) {
                finding.pack = self.id.to_string();
                finding.rule = rule.id.to_string();
                findings.push(finding);
            }
        }
        findings
    }
}

/// Ordered list of rule packs.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    packs: Vec<RulePack>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the IRC, IECC, NEC and Georgia packs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(RulePack {
            id: "IRC",
            title: "IRC 2018 residential structural",
            activation: Activation::CodeToken("IRC"),
            rules: irc::RULES,
        });
        registry.register(RulePack {
            id: "IECC",
            title: "IECC 2015 energy",
            activation: Activation::CodeToken("IECC"),
            rules: iecc::RULES,
        });
        registry.register(RulePack {
            id: "NEC",
            title: "NEC 2017 electrical",
            activation: Activation::CodeToken("NEC"),
            rules: nec::RULES,
        });
        registry.register(RulePack {
            id: "GA",
            title: "Georgia amendments",
            activation: Activation::State("GA"),
            rules: georgia::RULES,
        });
        registry
    }

    /// Add a pack. A pack with the same id is replaced in place.
    pub fn register(&mut self, pack: RulePack) {
        match self.packs.iter_mut().find(|p| p.id == pack.id) {
            Some(existing) => *existing = pack,
            None => self.packs.push(pack),
        }
    }

    pub fn packs(&self) -> &[RulePack] {
        &self.packs
    }

    pub fn get_by_id(&self, id: &str) -> Option<&RulePack> {
        self.packs.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Packs activated by a jurisdiction, in registry order.
    pub fn active_for<'a>(&'a self, jurisdiction: &'a Jurisdiction) -> impl Iterator<Item = &'a RulePack> {
        self.packs.iter().filter(move |p| p.activation.matches(jurisdiction))
    }
}

/// Findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub red: usize,
    pub orange: usize,
    pub yellow: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for f in findings {
            match f.severity {
                Severity::Red => counts.red += 1,
                Severity::Orange => counts.orange += 1,
                Severity::Yellow => counts.yellow += 1,
                Severity::Unknown => counts.unknown += 1,
            }
        }
        counts
    }
}

/// Result of evaluating a plan graph against a jurisdiction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub jurisdiction: Jurisdiction,
    pub activated_packs: Vec<String>,
    pub findings: Vec<Finding>,
    /// Packs that failed and contributed no findings
    pub errors: Vec<Diagnostic>,
    pub counts: SeverityCounts,
}

/// Evaluates activated rule packs and orders their findings.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    registry: Arc<RuleRegistry>,
}

impl RuleEngine {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate a plan graph. A pack that panics yields no findings and a
    /// `RuleEvaluation` diagnostic; the others still run.
    pub fn evaluate(&self, graph: &crate::model::PlanGraph, jurisdiction: &Jurisdiction) -> ComplianceReport {
        let index = PlanIndex::new(graph);
        let mut findings = Vec::new();
        let mut errors = Vec::new();
        let mut activated = Vec::new();

        for pack in self.registry.active_for(jurisdiction) {
            log::debug!("Activating rule pack {} for {}", pack.id, jurisdiction);
            activated.push(pack.id.to_string());

            match panic::catch_unwind(AssertUnwindSafe(|| pack.evaluate(&index))) {
                Ok(pack_findings) => findings.extend(pack_findings),
                Err(payload) => {
                    let reason = panic_message(payload.as_ref());
                    log::error!("Rule pack {} failed: {}", pack.id, reason);
                    let err = Error::RuleEvaluation {
                        pack: pack.id.to_string(),
                        reason,
                    };
                    errors.push(Diagnostic::from_error(DiagnosticKind::RuleEvaluation, pack.id, &err));
                }
            }
        }

        let findings = order_findings(findings);
        ComplianceReport {
            jurisdiction: jurisdiction.clone(),
            activated_packs: activated,
            counts: SeverityCounts::from_findings(&findings),
            findings,
            errors,
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(Arc::new(RuleRegistry::with_defaults()))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Sort findings by severity, assign `F-NNN` codes to uncoded findings, and
/// return them in (severity, code) order.
///
/// Within a severity, pre-coded findings keep their relative order ahead of
/// uncoded ones when numbers are handed out. The result is a fixed point of
/// sorting by severity then code.
pub fn order_findings(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| a.code.is_none().cmp(&b.code.is_none()))
            .then_with(|| a.code().cmp(b.code()))
    });
    for (pos, finding) in findings.iter_mut().enumerate() {
        if finding.code.is_none() {
            finding.code = Some(format!("F-{:03}", pos + 1));
        }
    }
    findings.sort_by(Finding::report_order);
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlanGraph;

    fn uncoded(severity: Severity) -> Finding {
        Finding::new(severity, "General", "Sheet", "Local amendment")
    }

    #[test]
    fn test_activation_tokens() {
        let registry = RuleRegistry::with_defaults();
        let ga = Jurisdiction::new("GA", "IRC2018_IECC2015_NEC2017_GA");
        let ids: Vec<&str> = registry.active_for(&ga).map(|p| p.id).collect();
        assert_eq!(ids, vec!["IRC", "IECC", "NEC", "GA"]);

        let tx = Jurisdiction::new("TX", "IRC2018");
        let ids: Vec<&str> = registry.active_for(&tx).map(|p| p.id).collect();
        assert_eq!(ids, vec!["IRC"]);
    }

    #[test]
    fn test_state_segment_activation() {
        assert!(Activation::State("GA").matches(&Jurisdiction::new("FL", "irc2018_ga")));
        assert!(!Activation::State("GA").matches(&Jurisdiction::new("FL", "IRC2018_GAS")));
        assert!(Activation::State("GA").matches(&Jurisdiction::new("ga", "")));
    }

    #[test]
    fn test_order_assigns_codes_after_sort() {
        let findings = vec![
            uncoded(Severity::Yellow),
            uncoded(Severity::Red),
            uncoded(Severity::Unknown),
            uncoded(Severity::Orange).with_code("RR-103"),
        ];
        let ordered = order_findings(findings);
        let codes: Vec<&str> = ordered.iter().map(|f| f.code()).collect();
        assert_eq!(codes, vec!["F-001", "RR-103", "F-003", "F-004"]);
        assert_eq!(ordered[3].severity, Severity::Unknown);
    }

    #[test]
    fn test_order_is_idempotent() {
        let ordered = order_findings(vec![
            uncoded(Severity::Yellow),
            uncoded(Severity::Yellow).with_code("GA-401"),
            uncoded(Severity::Red),
        ]);
        let again = order_findings(ordered.clone());
        assert_eq!(ordered, again);
    }

    fn explode(_: &PlanIndex) -> Vec<Finding> {
        panic!("malformed rule table")
    }

    const EXPLODING: &[Rule] = &[Rule::new("boom", explode)];

    #[test]
    fn test_failing_pack_is_isolated() {
        let mut registry = RuleRegistry::with_defaults();
        registry.register(RulePack {
            id: "LOCAL",
            title: "Broken local pack",
            activation: Activation::CodeToken("LOCAL"),
            rules: EXPLODING,
        });
        let engine = RuleEngine::new(Arc::new(registry));
        let report = engine.evaluate(&PlanGraph::new(), &Jurisdiction::new("TX", "IRC2018_LOCAL"));

        assert_eq!(report.activated_packs, vec!["IRC", "LOCAL"]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, DiagnosticKind::RuleEvaluation);
        assert!(report.errors[0].message.contains("malformed rule table"));
        assert!(report.findings.iter().all(|f| f.pack == "IRC"));
        assert!(!report.findings.is_empty());
    }

    #[test]
    fn test_empty_graph_findings_are_ordered() {
        let report = RuleEngine::default().evaluate(&PlanGraph::new(), &Jurisdiction::default());
        let ranks: Vec<u8> = report.findings.iter().map(|f| f.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        assert_eq!(report.counts.red, 1);
        assert!(report.findings.iter().all(|f| f.code.is_some()));
    }
}
