//! Georgia state amendments and Atlanta-area review items.

use super::index::PlanIndex;
use super::Rule;
use crate::model::{Finding, Severity, SheetDiscipline};

pub(super) const RULES: &[Rule] = &[
    Rule::new("GA-termite", termite_treatment),
    Rule::new("GA-low-slope-roof", low_slope_roofing),
    Rule::new("ATL-drainage", drainage),
    Rule::new("GA-design-criteria", design_criteria),
];

const LOW_SLOPE_PITCHES: &[&str] = &["1:12", "1.5:12", "2:12", "1/12", "1.5/12"];

fn termite_treatment(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["TERMITE", "PEST"]) {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Site / Foundation",
        "Foundation plans / general notes",
        "Georgia Amendment - Termite Protection (all counties)",
    )
    .with_code("GA-401")
    .with_consequence("Permit hold; add $800-$1,200 to budget; pre-treatment coordination")
    .with_fix(
        "Specify termite pre-treatment per Georgia requirements. Coordinate with licensed pest \
         control vendor. Note on plans.",
    )
    .with_evidence(["Foundation plan", "General notes"])
    .with_submittal("Termite treatment contract/certification")]
}

/// Low-slope pitches need an underlayment detail on the same or a later sheet.
fn low_slope_roofing(index: &PlanIndex) -> Vec<Finding> {
    let mut low_slope = false;
    let mut detailed = false;
    for sheet in index.sheets() {
        if sheet.mentions(LOW_SLOPE_PITCHES) {
            low_slope = true;
        }
        if low_slope && sheet.mentions(&["UNDERLAYMENT", "ICE/WATER", "HIGH-TEMP"]) {
            detailed = true;
        }
    }
    if !low_slope || detailed {
        return vec![];
    }
    vec![Finding::new(
        Severity::Orange,
        "Envelope/Roof",
        "Porch roof / low-slope areas",
        "IRC R905; Georgia hot-humid climate; manufacturer specs",
    )
    .with_code("RR-104")
    .with_consequence("Water intrusion at porch/roof tie-ins; warranty void; leak risk")
    .with_fix(
        "Specify low-slope system: high-temp underlayment (Ice & Water Shield equivalent), metal \
         panel OR modified bitumen suitable for pitch. Include kick-out flashings and \
         roof-to-wall details.",
    )
    .with_ve_alt("Standing-seam metal (Option B) suitable for low slopes; better longevity")
    .with_evidence(["Roof plan", "Porch details"])
    .with_submittal("Low-slope roofing spec and flashing details")]
}

/// Only raised when a site or civil sheet exists.
fn drainage(index: &PlanIndex) -> Vec<Finding> {
    let site: Vec<_> = index
        .sheets()
        .iter()
        .filter(|s| s.discipline == SheetDiscipline::Site || s.mentions(&["CIVIL"]))
        .collect();
    if site.is_empty()
        || site
            .iter()
            .any(|s| s.mentions(&["DRAINAGE", "RAIN GARDEN", "DETENTION"]))
    {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Civil/Site",
        "Site plan",
        "City of Atlanta Drainage Ordinance",
    )
    .with_code("GA-402")
    .with_consequence(
        "Permit review comment; potential rain garden requirement; drawdown compliance",
    )
    .with_fix(
        "Verify if stormwater management required (lot coverage, impervious area). If rain \
         garden needed, show location, sizing, drawdown ≤72h, and native plantings.",
    )
    .with_evidence(["Site plan"])
    .with_submittal("Stormwater management plan (if applicable)")]
}

fn design_criteria(index: &PlanIndex) -> Vec<Finding> {
    let wind = index
        .sheets()
        .iter()
        .any(|s| s.mentions(&["WIND"]) && s.mentions(&["MPH", "SPEED"]));
    let snow = index.any_sheet_mentions(&["SNOW"]);

    let mut findings = Vec::new();
    if !wind {
        findings.push(
            Finding::new(
                Severity::Yellow,
                "Structural/Design Criteria",
                "Title sheet / design notes",
                "IRC R301.2; Georgia wind speeds",
            )
            .with_code("GA-403")
            .with_consequence("Permit review delay; wind basis unclear for braced walls/trusses")
            .with_fix(
                "State design wind speed (Vult) and Exposure category. Typical Atlanta metro: \
                 115-120 mph Vult, Exposure B/C depending on site.",
            )
            .with_evidence(["Title sheet", "Structural notes"])
            .with_submittal("Design criteria statement with wind speed"),
        );
    }
    if !snow {
        findings.push(
            Finding::new(
                Severity::Yellow,
                "Structural/Design Criteria",
                "Title sheet / design notes",
                "IRC R301.2; Georgia snow loads",
            )
            .with_code("GA-404")
            .with_consequence("Roof load basis incomplete")
            .with_fix("State ground snow load. Typical Georgia: 5-10 psf depending on county elevation.")
            .with_evidence(["Title sheet", "Structural notes"])
            .with_submittal("Design criteria statement with snow load"),
        );
    }
    findings
}
