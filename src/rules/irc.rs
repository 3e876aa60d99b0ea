//! IRC 2018 residential structural rules.

use super::index::PlanIndex;
use super::Rule;
use crate::model::{Finding, ScheduleCategory, Severity};

pub(super) const RULES: &[Rule] = &[
    Rule::new("R602.10-braced-walls", braced_walls),
    Rule::new("R301.1-floor-joists", engineered_floor_joists),
    Rule::new("R802-roof-trusses", roof_trusses),
    Rule::new("R310-egress-windows", egress_windows),
    Rule::new("R403-footings", footings),
    Rule::new("R806-attic-ventilation", attic_ventilation),
];

fn braced_walls(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["BRACED WALL", "BWL", "CS-WSP"]) {
        return vec![];
    }
    vec![Finding::new(Severity::Orange, "Lateral/Wind", "Walls/elevations", "IRC 2018 R602.10")
        .with_code("RR-103")
        .with_consequence("Field redlines; shear continuity gaps; potential rework")
        .with_fix(
            "Produce braced-wall plan (each façade), method (CS-WSP recommended), lengths \
             provided vs required, segment locations, hold-downs & anchors. State Vult/Exposure.",
        )
        .with_ve_alt("Portal frames at large openings to reduce bracing requirements")
        .with_evidence(["Wall framing plans", "Elevations"])
        .with_submittal("Braced-wall plan with HD/AB schedule")]
}

/// Engineered joists called out on a sheet that shows no calc submittal.
fn engineered_floor_joists(index: &PlanIndex) -> Vec<Finding> {
    let Some(sheet) = index
        .sheets()
        .iter()
        .find(|s| s.mentions(&["BCI", "TJI", "I-JOIST"]))
    else {
        return vec![];
    };
    if sheet.mentions(&["CALC", "SUBMITTAL", "ENGINEER"]) {
        return vec![];
    }

    let joist = if sheet.mentions(&["BCI"]) { "BCI" } else { "TJI" };
    vec![Finding::new(
        Severity::Red,
        "Structural (Floor)",
        "Framing / Floor joist notes",
        "IRC R301.1; Manufacturer L/480 requirements",
    )
    .with_code("RR-101")
    .with_consequence("Framing inspection hold; bounce/finish cracking; deflection failures")
    .with_fix(format!(
        "Submit {} joist calc pack (actual spans, loads, L/480 deflection check) + LVL beam \
         calcs with reactions & bearing lengths",
        joist
    ))
    .with_ve_alt("Where spans are marginal, upgrade to deeper series or reduce spacing to 12\" o.c.")
    .with_evidence(["Framing plan notes", "Beam schedule"])
    .with_submittal(format!("{} span/deflection package with load tables", joist))]
}

fn roof_trusses(index: &PlanIndex) -> Vec<Finding> {
    let sealed = index
        .sheets()
        .iter()
        .find(|s| s.mentions(&["TRUSS"]))
        .is_some_and(|s| s.mentions(&["STAMP", "SEAL", "ENGINEER", "SUBMITTAL"]));
    if sealed {
        return vec![];
    }
    vec![Finding::new(
        Severity::Red,
        "Structural (Roof)",
        "Roof plan (trusses)",
        "IRC R802; Sealed truss submittals required",
    )
    .with_code("RR-102")
    .with_consequence("Permit/inspection delay; uplift/bracing ambiguity; approval risk")
    .with_fix(
        "Attach stamped truss set with reactions, heel heights, bracing requirements & \
         connector schedule matched to wind basis",
    )
    .with_evidence(["Roof framing plan"])
    .with_submittal("Stamped truss package with reactions & connector schedule")]
}

fn egress_windows(index: &PlanIndex) -> Vec<Finding> {
    if index.schedule_mentions(ScheduleCategory::Windows, &["EGRESS", "5.7", "5.0"]) {
        return vec![];
    }
    vec![Finding::new(Severity::Yellow, "Egress/Life Safety", "Bedroom windows", "IRC 2018 R310")
        .with_code("RR-105")
        .with_consequence("CO delay; field verification required")
        .with_fix(
            "Provide cut sheets proving 5.7/5.0 sf net clear opening & ≤44\" sill height. \
             Adjust unit sizes if needed.",
        )
        .with_ve_alt("Consider casement windows for easier egress compliance")
        .with_evidence(["Window schedule", "Bedroom floor plan"])
        .with_submittal("Egress window cut sheets with net clear dimensions")]
}

fn footings(index: &PlanIndex) -> Vec<Finding> {
    let detailed = index
        .sheets()
        .iter()
        .any(|s| s.mentions(&["FOOTING"]) && s.mentions(&["REBAR", "REINFORC"]));
    if detailed {
        return vec![];
    }
    vec![Finding::new(
        Severity::Yellow,
        "Foundations",
        "Foundation plan / crawl details",
        "IRC 2018 R403, R408",
    )
    .with_code("RR-107")
    .with_consequence("Moisture/settlement risk; rework potential")
    .with_fix(
        "Declare vented vs conditioned crawl, vapor barrier spec, footing sizes/rebar \
         (typically #4 @ 18\" o.c.), and frost depth compliance",
    )
    .with_ve_alt("Consider conditioned crawl with sealed vapor barrier for energy efficiency")
    .with_evidence(["Foundation plan", "Detail sections"])
    .with_submittal("Foundation/footing schedule with rebar callouts")]
}

fn attic_ventilation(index: &PlanIndex) -> Vec<Finding> {
    if index.any_sheet_mentions(&["NFA", "NET FREE AREA", "SEALED ATTIC", "UNVENTED"]) {
        return vec![];
    }
    vec![Finding::new(Severity::Yellow, "Roof/Moisture", "Attic/roof details", "IRC 2018 R806")
        .with_code("RR-108")
        .with_consequence("Moisture accumulation; shingle warranty void; mold risk")
        .with_fix(
            "Provide NFA calc (1:150 or 1:300 with balanced ventilation) OR declare sealed \
             attic with spray foam/vapor control details",
        )
        .with_ve_alt("Sealed attic approach with conditioned space for energy performance")
        .with_evidence(["Roof plan", "Attic details"])
        .with_submittal("Attic ventilation calc or sealed attic specification")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlanGraph, Sheet};

    fn index(texts: &[&str]) -> PlanIndex {
        let mut graph = PlanGraph::new();
        for (i, text) in texts.iter().enumerate() {
            graph.sheets.push(Sheet {
                file: "set.pdf".to_string(),
                page: i as u32 + 1,
                discipline: Default::default(),
                dimensions: vec![],
                text_excerpt: text.to_string(),
            });
        }
        PlanIndex::new(&graph)
    }

    #[test]
    fn test_joist_finding_names_product() {
        let findings = engineered_floor_joists(&index(&["FLOOR FRAMING: TJI 210 @ 16\" O.C."]));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code(), "RR-101");
        assert!(findings[0].fix.starts_with("Submit TJI"));

        assert!(engineered_floor_joists(&index(&["BCI joists per engineer calc"])).is_empty());
        assert!(engineered_floor_joists(&index(&["FLOOR PLAN"])).is_empty());
    }

    #[test]
    fn test_trusses_need_sealed_set() {
        assert_eq!(roof_trusses(&index(&["ROOF PLAN"])).len(), 1);
        assert_eq!(roof_trusses(&index(&["TRUSS LAYOUT BY OTHERS"])).len(), 1);
        assert!(roof_trusses(&index(&["TRUSS LAYOUT, SEALED SUBMITTAL"])).is_empty());
    }

    #[test]
    fn test_footing_needs_rebar_on_same_sheet() {
        assert_eq!(footings(&index(&["FOOTING 20x10", "REBAR NOTES"])).len(), 1);
        assert!(footings(&index(&["FOOTING 20x10 W/ (2) #4 REBAR"])).is_empty());
    }
}
