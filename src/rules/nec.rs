//! NEC 2017 electrical and life-safety rules.

use super::index::PlanIndex;
use super::Rule;
use crate::model::{Finding, Severity, SheetDiscipline};

pub(super) const RULES: &[Rule] = &[
    Rule::new("210.52-receptacles", electrical_sheets),
    Rule::new("210.12-afci", afci),
    Rule::new("220-load-calculation", load_calculation),
    Rule::new("625-ev-readiness", ev_readiness),
    Rule::new("R315-smoke-co", smoke_and_co_alarms),
];

fn electrical_sheets(index: &PlanIndex) -> Vec<Finding> {
    if index.has_discipline(SheetDiscipline::Electrical) {
        return vec![];
    }
    vec![Finding::new(Severity::Yellow, "Electrical", "Electrical plans", "NEC 2017 210.52")
        .with_code("ME-301")
        .with_consequence("Code corrections during rough-in; failed inspection")
        .with_fix(
            "Provide electrical plans showing receptacle locations. Verify 12ft max spacing per \
             NEC 210.52(A). Mark GFCI-protected circuits (bathrooms, kitchens, outdoors, garage).",
        )
        .with_evidence(["Electrical floor plans"])
        .with_submittal("Electrical plans with receptacle layout")]
}

fn afci(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["AFCI", "ARC FAULT"]) {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Electrical/Safety",
        "Panel schedule / notes",
        "NEC 2017 210.12",
    )
    .with_code("ME-302")
    .with_consequence("AFCI breaker requirement missed; panel/breaker corrections")
    .with_fix(
        "Specify AFCI breakers for dwelling unit 15/20A circuits (bedrooms, living, etc.). Note \
         combination AFCI or panel with AFCI breakers.",
    )
    .with_evidence(["Panel schedule"])
    .with_submittal("Panel schedule with AFCI breakers noted")]
}

fn load_calculation(index: &PlanIndex) -> Vec<Finding> {
    let found = index
        .sheets()
        .iter()
        .any(|s| s.mentions(&["LOAD CALC"]) || (s.mentions(&["SERVICE"]) && s.mentions(&["AMP"])));
    if found {
        return vec![];
    }
    vec![Finding::new(
        Severity::Orange,
        "Electrical/Load",
        "Electrical notes / panel schedule",
        "NEC 2017 220",
    )
    .with_code("ME-303")
    .with_consequence("Service size unclear; potential undersizing with EV/HVAC loads")
    .with_fix(
        "Provide load calculation per NEC 220 (general lighting, appliances, HVAC, EV if \
         applicable). Specify service size (typically 200A for modern SFR).",
    )
    .with_ve_alt("Consider 200A service minimum for future EV/solar readiness")
    .with_evidence(["Electrical notes"])
    .with_submittal("NEC 220 load calculation")]
}

fn ev_readiness(index: &PlanIndex) -> Vec<Finding> {
    let found = index.sheets().iter().any(|s| {
        s.mentions_word("EV") || s.mentions(&["ELECTRIC VEHICLE", "EVSE", "CHARGING"])
    });
    if found {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Electrical/EV",
        "Garage / panel schedule",
        "NEC 2017 625 (future-proofing recommendation)",
    )
    .with_code("ME-304")
    .with_consequence("No EV charging readiness; costly retrofit later")
    .with_fix(
        "Pre-wire EV circuit: 240V/50A dedicated circuit to garage with 6 AWG in 1\" conduit. \
         Update load calc and panel schedule.",
    )
    .with_ve_alt("Minimum: conduit stub for future EV circuit pull")
    .with_evidence(["Garage plan", "Panel schedule"])
    .with_submittal("EV circuit on panel schedule; update load calc")]
}

fn smoke_and_co_alarms(index: &PlanIndex) -> Vec<Finding> {
    let found = index
        .sheets()
        .iter()
        .any(|s| s.mentions_word("CO") || s.mentions(&["CARBON MONOXIDE", "SMOKE"]));
    if found {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "MEP/Life Safety",
        "Electrical plans / general notes",
        "IRC 2018 R315; NEC integration",
    )
    .with_code("ME-305")
    .with_consequence("CO/smoke detector placement missing; final inspection hold")
    .with_fix(
        "Show CO detector locations (outside sleeping areas, each level). Show smoke alarm \
         locations (bedrooms, hallways, each level). Specify interconnected hardwired with \
         battery backup.",
    )
    .with_evidence(["Electrical plans", "Life safety notes"])
    .with_submittal("CO/smoke detector plan")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanGraph, Sheet};

    fn index(discipline: SheetDiscipline, text: &str) -> PlanIndex {
        let mut graph = PlanGraph::new();
        graph.sheets.push(Sheet {
            file: "E-101.pdf".to_string(),
            page: 1,
            discipline,
            dimensions: vec![],
            text_excerpt: text.to_string(),
        });
        PlanIndex::new(&graph)
    }

    #[test]
    fn test_words_not_substrings() {
        let idx = index(SheetDiscipline::Architectural, "ELEVATIONS; CONCRETE SLAB");
        assert_eq!(ev_readiness(&idx).len(), 1);
        assert_eq!(smoke_and_co_alarms(&idx).len(), 1);

        let idx = index(SheetDiscipline::Electrical, "EV READY CIRCUIT. CO ALARM AT HALL");
        assert!(ev_readiness(&idx).is_empty());
        assert!(smoke_and_co_alarms(&idx).is_empty());
        assert!(electrical_sheets(&idx).is_empty());
    }

    #[test]
    fn test_service_needs_amps() {
        let idx = index(SheetDiscipline::Electrical, "SERVICE ENTRANCE");
        assert_eq!(load_calculation(&idx)[0].code(), "ME-303");
        let idx = index(SheetDiscipline::Electrical, "200 AMP SERVICE");
        assert!(load_calculation(&idx).is_empty());
    }
}
