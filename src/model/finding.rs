//! Compliance findings and jurisdictions.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Finding severity. Unknown values rank after every known severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Red,
    Orange,
    Yellow,
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Sort rank: Red=0, Orange=1, Yellow=2, anything else=3.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Red => 0,
            Severity::Orange => 1,
            Severity::Yellow => 2,
            Severity::Unknown => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Red => "Red",
            Severity::Orange => "Orange",
            Severity::Yellow => "Yellow",
            Severity::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One compliance issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable code; assigned by the rule engine when a rule leaves it unset
    pub code: Option<String>,
    pub severity: Severity,
    pub discipline: String,
    pub location: String,
    pub code_citation: String,
    pub consequence: String,
    pub fix: String,
    pub ve_alt: Option<String>,
    pub evidence_refs: Vec<String>,
    pub submittal_needed: Option<String>,
    /// Pack that produced the finding
    #[serde(default)]
    pub pack: String,
    /// Rule that produced the finding
    #[serde(default)]
    pub rule: String,
}

impl Finding {
    /// Start a finding with the required fields.
    pub fn new(
        severity: Severity,
        discipline: impl Into<String>,
        location: impl Into<String>,
        code_citation: impl Into<String>,
    ) -> Self {
        Self {
            code: None,
            severity,
            discipline: discipline.into(),
            location: location.into(),
            code_citation: code_citation.into(),
            consequence: String::new(),
            fix: String::new(),
            ve_alt: None,
            evidence_refs: Vec::new(),
            submittal_needed: None,
            pack: String::new(),
            rule: String::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_consequence(mut self, consequence: impl Into<String>) -> Self {
        self.consequence = consequence.into();
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = fix.into();
        self
    }

    pub fn with_ve_alt(mut self, alt: impl Into<String>) -> Self {
        self.ve_alt = Some(alt.into());
        self
    }

    pub fn with_evidence<S: Into<String>>(mut self, refs: impl IntoIterator<Item = S>) -> Self {
        self.evidence_refs = refs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_submittal(mut self, submittal: impl Into<String>) -> Self {
        self.submittal_needed = Some(submittal.into());
        self
    }

    /// The finding code, empty if not yet assigned.
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }

    /// Ordering used for final reports: severity rank, then code.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.severity
            .rank()
            .cmp(&other.severity.rank())
            .then_with(|| self.code().cmp(other.code()))
    }
}

/// Default state and code set.
pub const DEFAULT_STATE: &str = "GA";
pub const DEFAULT_CODE_SET: &str = "IRC2018_IECC2015_NEC2017_GA";

/// The authority whose codes apply to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub state: String,
    #[serde(default)]
    pub county: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    pub code_set: String,
}

impl Jurisdiction {
    pub fn new(state: impl Into<String>, code_set: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            county: None,
            municipality: None,
            code_set: code_set.into(),
        }
    }

    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = Some(county.into());
        self
    }

    pub fn with_municipality(mut self, municipality: impl Into<String>) -> Self {
        self.municipality = Some(municipality.into());
        self
    }
}

impl Default for Jurisdiction {
    fn default() -> Self {
        Self::new(DEFAULT_STATE, DEFAULT_CODE_SET)
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.state, self.code_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_rank() {
        assert!(Severity::Red.rank() < Severity::Orange.rank());
        assert!(Severity::Orange.rank() < Severity::Yellow.rank());
        assert_eq!(Severity::Unknown.rank(), 3);
    }

    #[test]
    fn test_unknown_severity_deserializes() {
        let sev: Severity = serde_json::from_str("\"Purple\"").unwrap();
        assert_eq!(sev, Severity::Unknown);
    }

    #[test]
    fn test_finding_builder() {
        let finding = Finding::new(Severity::Orange, "Lateral/Wind", "Shear walls", "IRC R602.10")
            .with_code("RR-103")
            .with_fix("Add braced wall plan")
            .with_evidence(["S-101"]);
        assert_eq!(finding.code(), "RR-103");
        assert_eq!(finding.evidence_refs, vec!["S-101".to_string()]);
        assert!(finding.ve_alt.is_none());
    }

    #[test]
    fn test_report_order() {
        let a = Finding::new(Severity::Yellow, "", "", "").with_code("A-1");
        let b = Finding::new(Severity::Red, "", "", "").with_code("Z-9");
        assert_eq!(a.report_order(&b), Ordering::Greater);
    }

    #[test]
    fn test_default_jurisdiction() {
        let j = Jurisdiction::default();
        assert_eq!(j.state, "GA");
        assert_eq!(j.code_set, "IRC2018_IECC2015_NEC2017_GA");
    }
}
