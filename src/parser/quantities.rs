//! Reading quantity rows out of schedule tables.

use crate::model::{ScheduleCategory, Table};

use super::classify::has_size_callout;

const QTY_KEYWORDS: &[&str] = &["QTY", "QUANTITY", "COUNT"];
const UOM_KEYWORDS: &[&str] = &["UOM", "UNIT", "UNITS"];
const MARK_KEYWORDS: &[&str] = &["MARK", "TAG", "SYMBOL", "ID"];
const DESCRIPTION_KEYWORDS: &[&str] = &["DESCRIPTION", "TYPE", "ITEM", "MODEL", "MATERIAL", "FINISH"];
const SIZE_KEYWORDS: &[&str] = &["SIZE", "DIMENSION", "DIMENSIONS", "WIDTH"];
const ALT_KEYWORDS: &[&str] = &["ALT", "ALTERNATE"];

/// Descriptions that price as the catalog's HVAC system.
const HVAC_MARKERS: &[&str] = &["HVAC", "HEAT PUMP", "AIR HANDLER", "FURNACE", "CONDENS"];

/// Finish descriptions mapped to spec-tier bundle categories. First match wins.
const FINISH_MARKERS: &[(&[&str], &str)] = &[
    (&["COUNTER", "QUARTZ", "GRANITE"], "Countertops"),
    (&["CABINET"], "Cabinets"),
    (&["LIGHT", "PENDANT", "CHANDELIER"], "Lighting"),
    (&["FAUCET", "FIXTURE"], "Fixtures"),
    (&["CARPET"], "Flooring_Carpet"),
    (&["LVP", "VINYL", "HARDWOOD", "TILE", "WOOD FLOOR"], "Flooring_Hard"),
];

/// Bundle category for a finish description, if it names one.
pub fn finish_bundle_category(description: &str) -> Option<&'static str> {
    let upper = description.to_uppercase();
    FINISH_MARKERS
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| upper.contains(m)))
        .map(|(_, category)| *category)
}

fn words(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

fn has_word(header: &str, keywords: &[&str]) -> bool {
    words(header).any(|w| keywords.contains(&w))
}

/// Column positions of a schedule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub qty: usize,
    pub uom: Option<usize>,
    pub mark: Option<usize>,
    pub description: Option<usize>,
    pub size: Option<usize>,
    pub alt: Option<usize>,
}

impl ColumnMap {
    /// Locate columns by header keyword. `None` when there is no quantity column.
    pub fn locate(table: &Table) -> Option<Self> {
        let qty = table.find_column(|h| h == "#" || has_word(h, QTY_KEYWORDS))?;
        let other = |keywords: &'static [&'static str]| {
            table
                .header_cells()
                .iter()
                .enumerate()
                .position(|(i, cell)| i != qty && has_word(&cell.to_uppercase(), keywords))
        };

        Some(Self {
            qty,
            uom: table
                .find_column(|h| h == "U/M")
                .filter(|i| *i != qty)
                .or_else(|| other(UOM_KEYWORDS)),
            mark: other(MARK_KEYWORDS),
            description: other(DESCRIPTION_KEYWORDS),
            size: other(SIZE_KEYWORDS),
            alt: other(ALT_KEYWORDS),
        })
    }
}

/// One body row with a usable quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReading {
    /// Zero-based body row index
    pub row: usize,
    pub value: f64,
    pub mark: Option<String>,
    pub description: Option<String>,
    pub uom: Option<String>,
    pub has_dimensions: bool,
    pub alt_group: Option<String>,
}

/// Parse a quantity cell: `4`, `1,200`, `12 EA`, `-2`.
pub fn parse_quantity(cell: &str) -> Option<f64> {
    let cleaned: String = cell.trim().replace(',', "");
    let number: String = cleaned
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect();
    let value: f64 = number.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Read every body row whose quantity parses to a non-zero number.
pub fn read_rows(table: &Table, columns: &ColumnMap, category: ScheduleCategory) -> Vec<RowReading> {
    table
        .body()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let value = row.cell(columns.qty).and_then(parse_quantity)?;
            if value == 0.0 {
                return None;
            }
            let text = |col: Option<usize>| col.and_then(|c| row.cell(c)).map(str::to_string);
            Some(RowReading {
                row: idx,
                value,
                mark: text(columns.mark),
                description: text(columns.description),
                uom: text(columns.uom)
                    .map(|u| u.to_uppercase())
                    .or_else(|| default_uom(category).map(str::to_string)),
                has_dimensions: columns
                    .size
                    .and_then(|c| row.cell(c))
                    .is_some_and(has_size_callout),
                alt_group: text(columns.alt),
            })
        })
        .collect()
}

/// Unit of measure assumed when a schedule has no unit column.
pub fn default_uom(category: ScheduleCategory) -> Option<&'static str> {
    match category {
        ScheduleCategory::Windows | ScheduleCategory::Doors | ScheduleCategory::Equipment => Some("EA"),
        ScheduleCategory::Finishes => None,
    }
}

/// Trade, WBS code, assembly and catalog item for a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub trade: &'static str,
    pub wbs: &'static str,
    pub assembly: &'static str,
    pub item: String,
}

/// Map a schedule category and row description to its cost classification.
pub fn classify_row(category: ScheduleCategory, description: Option<&str>) -> Classification {
    match category {
        ScheduleCategory::Windows => Classification {
            trade: "Openings",
            wbs: "08.50",
            assembly: "Openings - Windows",
            item: "Windows".to_string(),
        },
        ScheduleCategory::Doors => Classification {
            trade: "Openings",
            wbs: "08.10",
            assembly: "Openings - Doors",
            item: "Doors".to_string(),
        },
        ScheduleCategory::Equipment => {
            let is_hvac = description.is_some_and(|d| {
                let upper = d.to_uppercase();
                HVAC_MARKERS.iter().any(|m| upper.contains(m))
            });
            Classification {
                trade: "Mechanical",
                wbs: "23.00",
                assembly: "Mechanical Equipment",
                item: if is_hvac {
                    "HVAC".to_string()
                } else {
                    description.unwrap_or("Equipment").to_string()
                },
            }
        }
        ScheduleCategory::Finishes => Classification {
            trade: "Finishes",
            wbs: "09.00",
            assembly: "Interior Finishes",
            item: description
                .and_then(finish_bundle_category)
                .or(description)
                .unwrap_or("Finishes")
                .to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_table() -> Table {
        Table::from_rows(vec![
            vec!["MARK", "SIZE", "TYPE", "QTY.", "ALT"],
            vec!["W1", "3'-0\"x5'-0\"", "Double hung", "4", ""],
            vec!["W2", "", "Casement", "n/a", ""],
            vec!["W3", "2'-0\"x3'-0\"", "Fixed", "0", ""],
            vec!["W4", "", "Picture", "2", "ALT-1"],
        ])
    }

    #[test]
    fn test_locate_columns() {
        let columns = ColumnMap::locate(&window_table()).unwrap();
        assert_eq!(columns.qty, 3);
        assert_eq!(columns.mark, Some(0));
        assert_eq!(columns.size, Some(1));
        assert_eq!(columns.description, Some(2));
        assert_eq!(columns.alt, Some(4));
        assert_eq!(columns.uom, None);
    }

    #[test]
    fn test_no_quantity_column() {
        let table = Table::from_rows(vec![vec!["MARK", "SIZE"], vec!["W1", "3'-0\""]]);
        assert!(ColumnMap::locate(&table).is_none());
    }

    #[test]
    fn test_read_rows_skips_zero_and_unparseable() {
        let table = window_table();
        let columns = ColumnMap::locate(&table).unwrap();
        let rows = read_rows(&table, &columns, ScheduleCategory::Windows);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 0);
        assert!(rows[0].has_dimensions);
        assert_eq!(rows[0].uom.as_deref(), Some("EA"));
        assert_eq!(rows[1].row, 3);
        assert!(!rows[1].has_dimensions);
        assert_eq!(rows[1].alt_group.as_deref(), Some("ALT-1"));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("4"), Some(4.0));
        assert_eq!(parse_quantity("1,200"), Some(1200.0));
        assert_eq!(parse_quantity("12 EA"), Some(12.0));
        assert_eq!(parse_quantity("-2"), Some(-2.0));
        assert_eq!(parse_quantity("TBD"), None);
        assert_eq!(parse_quantity(""), None);
    }

    #[test]
    fn test_finishes_have_no_default_uom() {
        let table = Table::from_rows(vec![vec!["ROOM", "FINISH", "QUANTITY"], vec!["101", "Carpet", "350"]]);
        let columns = ColumnMap::locate(&table).unwrap();
        let rows = read_rows(&table, &columns, ScheduleCategory::Finishes);
        assert_eq!(rows[0].uom, None);
        assert_eq!(rows[0].description.as_deref(), Some("Carpet"));
    }

    #[test]
    fn test_equipment_classification() {
        let hvac = classify_row(ScheduleCategory::Equipment, Some("Split heat pump 3 ton"));
        assert_eq!(hvac.item, "HVAC");
        assert_eq!(hvac.trade, "Mechanical");

        let other = classify_row(ScheduleCategory::Equipment, Some("Water heater"));
        assert_eq!(other.item, "Water heater");

        let door = classify_row(ScheduleCategory::Doors, None);
        assert_eq!((door.wbs, door.item.as_str()), ("08.10", "Doors"));
    }

    #[test]
    fn test_finish_descriptions_map_to_bundles() {
        let item = |d: &str| classify_row(ScheduleCategory::Finishes, Some(d)).item;
        assert_eq!(item("Carpet"), "Flooring_Carpet");
        assert_eq!(item("LVP - Oak"), "Flooring_Hard");
        assert_eq!(item("Porcelain tile"), "Flooring_Hard");
        assert_eq!(item("Quartz countertop"), "Countertops");
        assert_eq!(item("Shaker cabinets"), "Cabinets");
        assert_eq!(item("Light fixture"), "Lighting");
        assert_eq!(item("Kitchen faucet"), "Fixtures");
        assert_eq!(item("Paint eggshell"), "Paint eggshell");
        assert_eq!(classify_row(ScheduleCategory::Finishes, None).item, "Finishes");
    }
}
