//! Upper-cased view of a plan graph that rule predicates search.

use std::collections::BTreeMap;

use crate::model::{PlanGraph, ScheduleCategory, SheetDiscipline};

/// One sheet as seen by rules.
#[derive(Debug, Clone)]
pub struct IndexedSheet {
    pub discipline: SheetDiscipline,
    /// Upper-cased text excerpt
    pub text: String,
}

impl IndexedSheet {
    /// True if any needle occurs in the sheet text.
    pub fn mentions(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.text.contains(n))
    }

    /// True if `word` occurs as a whole word.
    pub fn mentions_word(&self, word: &str) -> bool {
        contains_word(&self.text, word)
    }
}

/// Text of a plan graph, prepared once per evaluation.
#[derive(Debug, Clone, Default)]
pub struct PlanIndex {
    sheets: Vec<IndexedSheet>,
    schedules: BTreeMap<ScheduleCategory, Vec<String>>,
}

impl PlanIndex {
    pub fn new(graph: &PlanGraph) -> Self {
        Self {
            sheets: graph
                .sheets
                .iter()
                .map(|s| IndexedSheet {
                    discipline: s.discipline,
                    text: s.text_excerpt.to_uppercase(),
                })
                .collect(),
            schedules: graph
                .schedules
                .iter()
                .map(|(category, captures)| {
                    (
                        *category,
                        captures.iter().map(|c| c.raw_text.to_uppercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn sheets(&self) -> &[IndexedSheet] {
        &self.sheets
    }

    /// True if some sheet mentions any of the needles.
    pub fn any_sheet_mentions(&self, needles: &[&str]) -> bool {
        self.sheets.iter().any(|s| s.mentions(needles))
    }

    pub fn has_discipline(&self, discipline: SheetDiscipline) -> bool {
        self.sheets.iter().any(|s| s.discipline == discipline)
    }

    /// Upper-cased raw text of every capture of a schedule category.
    pub fn schedule_texts(&self, category: ScheduleCategory) -> &[String] {
        self.schedules
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if some capture of the category mentions any of the needles.
    pub fn schedule_mentions(&self, category: ScheduleCategory, needles: &[&str]) -> bool {
        self.schedule_texts(category)
            .iter()
            .any(|t| needles.iter().any(|n| t.contains(n)))
    }
}

/// Whole-word containment; words are runs of alphanumerics.
pub fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScheduleCapture, Sheet};

    fn graph() -> PlanGraph {
        let mut graph = PlanGraph::new();
        graph.sheets.push(Sheet {
            file: "A.pdf".to_string(),
            page: 1,
            discipline: SheetDiscipline::Electrical,
            dimensions: vec![],
            text_excerpt: "Panel schedule, provide co alarms".to_string(),
        });
        graph
            .schedules
            .entry(ScheduleCategory::Windows)
            .or_default()
            .push(ScheduleCapture {
                document: "A.pdf".to_string(),
                page: 2,
                raw_text: "Window schedule, u-factor 0.30".to_string(),
                tables: vec![],
            });
        graph
    }

    #[test]
    fn test_index_uppercases() {
        let index = PlanIndex::new(&graph());
        assert!(index.any_sheet_mentions(&["PANEL SCHEDULE"]));
        assert!(index.sheets()[0].mentions_word("CO"));
        assert!(index.schedule_mentions(ScheduleCategory::Windows, &["U-FACTOR"]));
        assert!(!index.schedule_mentions(ScheduleCategory::Doors, &["U-FACTOR"]));
        assert!(index.has_discipline(SheetDiscipline::Electrical));
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("EV READY GARAGE", "EV"));
        assert!(!contains_word("ELEVATIONS", "EV"));
        assert!(!contains_word("CONCRETE", "CO"));
    }
}
