//! Keyword classification of sheets and schedules, and dimension callouts.
//!
//! All matching is done on upper-cased, normalized text. Keyword lists are
//! evaluated in a fixed order, so classification is deterministic.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Dimension, ScheduleCategory, SheetDiscipline};

/// Discipline keywords in priority order.
const DISCIPLINE_KEYWORDS: [(SheetDiscipline, &[&str]); 6] = [
    (
        SheetDiscipline::Structural,
        &["STRUCTURAL", "FOUNDATION", "FRAMING", "BEAM SCHEDULE"],
    ),
    (
        SheetDiscipline::Architectural,
        &["FLOOR PLAN", "ELEVATIONS", "SECTIONS"],
    ),
    (SheetDiscipline::Mechanical, &["HVAC", "MECHANICAL", "DUCTWORK"]),
    (
        SheetDiscipline::Electrical,
        &["ELECTRICAL", "LIGHTING", "PANEL SCHEDULE"],
    ),
    (SheetDiscipline::Plumbing, &["PLUMBING", "PIPING", "FIXTURE"]),
    (SheetDiscipline::Site, &["SITE PLAN", "CIVIL", "GRADING"]),
];

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d{1,3})'(?:\s*-?\s*(\d{1,2})")?"#).expect("dimension pattern compiles")
});

/// Replace typographic quotes and primes with ASCII, then apply NFKC.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{2032}' | '\u{00B4}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{2033}' => '"',
            other => other,
        })
        .collect::<String>()
        .nfkc()
        .collect()
}

/// Tag a page with the first discipline whose keywords appear in it.
pub fn classify_discipline(text: &str) -> SheetDiscipline {
    let upper = text.to_uppercase();
    DISCIPLINE_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k)))
        .map(|(d, _)| *d)
        .unwrap_or_default()
}

/// Header keywords that open a schedule section.
pub fn schedule_keywords(category: ScheduleCategory) -> &'static [&'static str] {
    match category {
        ScheduleCategory::Windows => &["WINDOW SCHEDULE", "WINDOW SCHED"],
        ScheduleCategory::Doors => &["DOOR SCHEDULE", "DOOR SCHED"],
        ScheduleCategory::Equipment => &["EQUIPMENT SCHEDULE", "EQUIP SCHED"],
        ScheduleCategory::Finishes => &["FINISH SCHEDULE", "FINISHES"],
    }
}

/// Word stems that name a category in a table caption or header row.
fn category_stems(category: ScheduleCategory) -> &'static [&'static str] {
    match category {
        ScheduleCategory::Windows => &["WINDOW"],
        ScheduleCategory::Doors => &["DOOR"],
        ScheduleCategory::Equipment => &["EQUIPMENT", "EQUIP"],
        ScheduleCategory::Finishes => &["FINISH"],
    }
}

/// Schedule categories whose header keywords appear in the text.
pub fn detect_schedules(text: &str) -> Vec<ScheduleCategory> {
    let upper = text.to_uppercase();
    ScheduleCategory::ALL
        .into_iter()
        .filter(|c| schedule_keywords(*c).iter().any(|k| upper.contains(k)))
        .collect()
}

/// Line indexes of schedule header lines, in page order.
pub fn schedule_header_lines(text: &str) -> Vec<(usize, ScheduleCategory)> {
    let mut headers = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let upper = line.to_uppercase();
        for category in ScheduleCategory::ALL {
            if schedule_keywords(category).iter().any(|k| upper.contains(k)) {
                headers.push((idx, category));
            }
        }
    }
    headers
}

/// The category a caption or header row names, if any.
///
/// Only categories in `candidates` are considered; full header keywords are
/// tried before bare stems.
pub fn category_named_in(text: &str, candidates: &[ScheduleCategory]) -> Option<ScheduleCategory> {
    let upper = text.to_uppercase();
    candidates
        .iter()
        .copied()
        .find(|c| schedule_keywords(*c).iter().any(|k| upper.contains(k)))
        .or_else(|| {
            let words: Vec<&str> = upper.split(|ch: char| !ch.is_alphanumeric()).collect();
            candidates.iter().copied().find(|c| {
                category_stems(*c).iter().any(|stem| {
                    words
                        .iter()
                        .any(|w| w == stem || w.strip_suffix('S') == Some(*stem))
                })
            })
        })
}

/// Feet-and-inches callouts: `10'-6"`, `8'0"`, `12'`.
pub fn extract_dimensions(text: &str) -> Vec<Dimension> {
    let normalized = normalize(text);
    DIMENSION
        .captures_iter(&normalized)
        .filter_map(|caps| {
            let raw = caps.get(0)?.as_str();
            let feet = caps.get(1)?.as_str().parse().ok()?;
            let inches = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            Some(Dimension::new(raw, feet, inches))
        })
        .collect()
}

/// True when a size cell holds a feet-inches or `W x H` callout.
pub fn has_size_callout(cell: &str) -> bool {
    let normalized = normalize(cell);
    if DIMENSION.is_match(&normalized) {
        return true;
    }
    let lower = normalized.to_lowercase();
    let mut parts = lower.split(['x', '\u{00D7}']);
    match (parts.next(), parts.next()) {
        (Some(w), Some(h)) => {
            let digit_end = w.trim().chars().last().is_some_and(|c| c.is_ascii_digit());
            let digit_start = h.trim().chars().next().is_some_and(|c| c.is_ascii_digit());
            digit_end && digit_start
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discipline_priority() {
        assert_eq!(
            classify_discipline("FOUNDATION PLAN / FLOOR PLAN"),
            SheetDiscipline::Structural
        );
        assert_eq!(
            classify_discipline("First floor plan"),
            SheetDiscipline::Architectural
        );
        assert_eq!(
            classify_discipline("PANEL SCHEDULE and PLUMBING riser"),
            SheetDiscipline::Electrical
        );
        assert_eq!(classify_discipline("GENERAL NOTES"), SheetDiscipline::Unknown);
    }

    #[test]
    fn test_detect_schedules() {
        let found = detect_schedules("DOOR SCHEDULE\n...\nWindow Sched.");
        assert_eq!(
            found,
            vec![ScheduleCategory::Windows, ScheduleCategory::Doors]
        );
        assert!(detect_schedules("ROOF PLAN").is_empty());
    }

    #[test]
    fn test_dimensions() {
        let dims = extract_dimensions("WALL 10'-6\" HIGH, 8'0\" DOOR, 12' SPAN");
        let inches: Vec<u32> = dims.iter().map(|d| d.total_inches).collect();
        assert_eq!(inches, vec![126, 96, 144]);
        assert_eq!(dims[0].raw, "10'-6\"");
    }

    #[test]
    fn test_dimensions_typographic_quotes() {
        let dims = extract_dimensions("3\u{2019}-0\u{201D} x 5\u{2032}-0\u{2033}");
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[1].total_inches, 60);
    }

    #[test]
    fn test_category_named_in() {
        let all = ScheduleCategory::ALL;
        assert_eq!(
            category_named_in("EXTERIOR DOORS", &all),
            Some(ScheduleCategory::Doors)
        );
        assert_eq!(
            category_named_in("MARK | WINDOW TYPE | QTY", &all),
            Some(ScheduleCategory::Windows)
        );
        assert_eq!(category_named_in("MARK | QTY", &all), None);
        assert_eq!(
            category_named_in("DOOR HARDWARE", &[ScheduleCategory::Windows]),
            None
        );
    }

    #[test]
    fn test_size_callout() {
        assert!(has_size_callout("3'-0\"x5'-0\""));
        assert!(has_size_callout("36 x 60"));
        assert!(!has_size_callout("Casement"));
        assert!(!has_size_callout("Box"));
    }
}
