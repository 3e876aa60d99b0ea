//! IECC 2015 energy rules (climate zone 3 prescriptive values).

use super::index::PlanIndex;
use super::Rule;
use crate::model::{Finding, ScheduleCategory, Severity};

pub(super) const RULES: &[Rule] = &[
    Rule::new("R402.1-insulation", insulation),
    Rule::new("R402.4-window-ratings", window_ratings),
    Rule::new("R402.4-air-sealing", air_sealing),
    Rule::new("R402.2-compliance-path", compliance_path),
];

fn insulation(index: &PlanIndex) -> Vec<Finding> {
    let ceiling = index.any_sheet_mentions(&["R-30", "R30"]);
    let walls = index.any_sheet_mentions(&["R-13", "R13", "R-20"]);
    if ceiling && walls {
        return vec![];
    }
    vec![Finding::new(
        Severity::Orange,
        "Envelope/Energy",
        "Building sections / wall details",
        "IECC 2015 R402.1 (Climate Zone 3, Georgia)",
    )
    .with_code("EE-201")
    .with_consequence("Energy code non-compliance; blower door failure; utility cost impact")
    .with_fix(
        "Add insulation callouts: R-30 ceiling/attic, R-13 wall cavities (or R-20 continuous), \
         R-5 slab edge per IECC Table R402.1.2. Specify installation grade I.",
    )
    .with_ve_alt(
        "Upgrade to R-38 attic + R-15 walls for better energy performance, resale value, and \
         code compliance buffer",
    )
    .with_evidence(["Wall sections", "Roof/attic details"])
    .with_submittal("Insulation schedule with R-values and installation method")]
}

fn window_ratings(index: &PlanIndex) -> Vec<Finding> {
    if index.schedule_mentions(ScheduleCategory::Windows, &["U-FACTOR", "SHGC", "U="]) {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Envelope/Windows",
        "Window schedule",
        "IECC 2015 R402.4.1, Table R402.1.2",
    )
    .with_code("EE-202")
    .with_consequence(
        "Cannot verify air leakage compliance (Max 0.30 cfm/sf window area). Energy loss.",
    )
    .with_fix(
        "Provide window schedule with U-factor (≤0.35 CZ3) and SHGC (≤0.25 for south-facing \
         recommended). Specify installation with pan flashing and air seal details.",
    )
    .with_ve_alt(
        "Consider high-performance windows (U ≤ 0.30, SHGC ≤ 0.23) for energy code buffer and comfort",
    )
    .with_evidence(["Window schedule"])
    .with_submittal("Window cut sheets with NFRC ratings")]
}

fn air_sealing(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["AIR SEAL", "BLOWER DOOR", "ACH50"]) {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Envelope/Air Barrier",
        "General notes / sections",
        "IECC 2015 R402.4",
    )
    .with_code("EE-203")
    .with_consequence("Blower door test failure risk (target ≤3 ACH50); energy penalty")
    .with_fix(
        "Add air sealing continuity details at: rim joists, top plates, penetrations, \
         windows/doors. Specify blower door target ≤3 ACH50 or use 5 ACH50 table values.",
    )
    .with_ve_alt("Sealed attic approach with spray foam for comprehensive air barrier")
    .with_evidence(["Wall sections", "General notes"])
    .with_submittal("Air barrier continuity plan")]
}

fn compliance_path(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["PRESCRIPTIVE", "PERFORMANCE", "RESCHECK", "COMCHECK", "UA TRADE"]) {
        return vec![];
    }
    vec![Finding::new(Severity::Yellow, "Energy/Compliance", "General notes", "IECC 2015 R402.2")
        .with_code("EE-204")
        .with_consequence("Energy compliance path unclear; permit review delay")
        .with_fix(
            "Declare energy compliance path: Prescriptive (R-values + U/SHGC) OR UA Trade-off \
             (REScheck) OR Performance (energy model). Provide documentation.",
        )
        .with_evidence(["Title sheet", "General notes"])
        .with_submittal("REScheck report or energy compliance declaration")]
}
