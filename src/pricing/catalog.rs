//! Unit-cost catalog and spec-tier bundles.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::SpecTier;

/// Read-only source of base unit costs.
pub trait CatalogSource: Send + Sync {
    /// Base unit cost for an exact trade and item.
    fn unit_cost(&self, trade: &str, item: &str) -> Option<f64>;

    /// Bundle for a spec tier.
    fn spec_bundle(&self, tier: SpecTier) -> Option<&SpecBundle>;
}

/// One catalog line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub trade: String,
    pub item: String,
    pub uom: String,
    pub unit_cost: f64,
}

/// A finish selection priced per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Quantity category this entry prices (e.g. "Windows")
    pub category: String,
    pub item: String,
    pub uom: String,
    pub unit_cost: f64,
}

/// Finish selections for one spec tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecBundle {
    pub tier: SpecTier,
    pub entries: Vec<BundleEntry>,
}

impl SpecBundle {
    /// Entry for a category, compared case-insensitively.
    pub fn entry_for(&self, category: &str) -> Option<&BundleEntry> {
        self.entries
            .iter()
            .find(|e| e.category.eq_ignore_ascii_case(category.trim()))
    }
}

/// The catalog and bundles as one loadable unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBook {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub bundles: Vec<SpecBundle>,
}

fn entry(trade: &str, item: &str, uom: &str, unit_cost: f64) -> CatalogEntry {
    CatalogEntry {
        trade: trade.to_string(),
        item: item.to_string(),
        uom: uom.to_string(),
        unit_cost,
    }
}

fn bundle(tier: SpecTier, entries: &[(&str, &str, f64, &str)]) -> SpecBundle {
    SpecBundle {
        tier,
        entries: entries
            .iter()
            .map(|(category, item, unit_cost, uom)| BundleEntry {
                category: category.to_string(),
                item: item.to_string(),
                uom: uom.to_string(),
                unit_cost: *unit_cost,
            })
            .collect(),
    }
}

impl CostBook {
    /// Built-in reference catalog and bundles.
    pub fn builtin() -> Self {
        let catalog = vec![
            entry("Concrete", "Foundation", "LF", 45.00),
            entry("Concrete", "Slab", "SF", 23.00),
            entry("Framing", "Wall Framing", "SF", 8.50),
            entry("Framing", "Walls", "SF", 23.00),
            entry("Drywall", "Drywall Install", "SF", 2.75),
            entry("Electrical", "Rough-in", "EA", 850.00),
            entry("Electrical", "Outlet", "EA", 205.00),
            entry("Plumbing", "Rough-in", "EA", 1200.00),
            entry("Plumbing", "Fixture", "EA", 245.00),
            entry("Mechanical", "HVAC", "UNIT", 920.00),
            entry("Openings", "Doors", "EA", 235.00),
            entry("Openings", "Windows", "EA", 295.00),
            entry("Roofing", "Roof", "SF", 37.00),
        ];

        let bundles = vec![
            bundle(
                SpecTier::Standard,
                &[
                    ("Roofing", "Architectural Shingle - 30yr", 3.25, "SF"),
                    ("Windows", "Vinyl Window - Energy Star", 385.0, "EA"),
                    ("Flooring_Carpet", "Carpet - Nylon", 3.50, "SF"),
                    ("Flooring_Hard", "Luxury Vinyl Plank", 4.25, "SF"),
                    ("Cabinets", "Semi-Custom Painted", 185.0, "LF"),
                    ("Countertops", "Laminate or Basic Quartz", 42.0, "SF"),
                    ("Fixtures", "Builder-Grade Faucets", 145.0, "EA"),
                    ("Lighting", "Builder-Grade Fixtures", 85.0, "EA"),
                ],
            ),
            bundle(
                SpecTier::Premium,
                &[
                    ("Roofing", "Designer Shingle - 50yr", 4.75, "SF"),
                    ("Windows", "Fiberglass Window - Low-E", 625.0, "EA"),
                    ("Flooring_Hard", "Engineered Hardwood", 8.50, "SF"),
                    ("Cabinets", "Custom Stained", 295.0, "LF"),
                    ("Countertops", "Mid-Grade Quartz/Granite", 68.0, "SF"),
                    ("Fixtures", "Mid-Range Designer", 285.0, "EA"),
                    ("Lighting", "Designer Fixtures", 195.0, "EA"),
                ],
            ),
            bundle(
                SpecTier::Luxury,
                &[
                    ("Roofing", "Standing Seam Metal", 12.50, "SF"),
                    ("Windows", "Wood-Clad Premium - Impact", 1150.0, "EA"),
                    ("Flooring_Hard", "Solid Hardwood - Wide Plank", 14.00, "SF"),
                    ("Cabinets", "Full Custom Premium", 485.0, "LF"),
                    ("Countertops", "Premium Stone - Waterfall", 125.0, "SF"),
                    ("Fixtures", "Luxury Brands - Premium", 625.0, "EA"),
                    ("Lighting", "Luxury Chandeliers/Pendants", 485.0, "EA"),
                ],
            ),
        ];

        Self { catalog, bundles }
    }

    /// Parse a cost book from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let book: Self = serde_json::from_str(json)?;
        book.validate()?;
        Ok(book)
    }

    /// Load a cost book from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        let costs = self
            .catalog
            .iter()
            .map(|e| (format!("{}/{}", e.trade, e.item), e.unit_cost))
            .chain(self.bundles.iter().flat_map(|b| {
                b.entries
                    .iter()
                    .map(move |e| (format!("{} {}", b.tier, e.category), e.unit_cost))
            }));
        for (name, cost) in costs {
            if !cost.is_finite() || cost < 0.0 {
                return Err(Error::Config(format!("invalid unit cost {} for {}", cost, name)));
            }
        }
        Ok(())
    }
}

impl CatalogSource for CostBook {
    fn unit_cost(&self, trade: &str, item: &str) -> Option<f64> {
        self.catalog
            .iter()
            .find(|e| e.trade == trade && e.item == item)
            .map(|e| e.unit_cost)
    }

    fn spec_bundle(&self, tier: SpecTier) -> Option<&SpecBundle> {
        self.bundles.iter().find(|b| b.tier == tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_is_exact() {
        let book = CostBook::builtin();
        assert_eq!(book.unit_cost("Mechanical", "HVAC"), Some(920.0));
        assert_eq!(book.unit_cost("mechanical", "HVAC"), None);
        assert_eq!(book.unit_cost("Mechanical", "Boiler"), None);
    }

    #[test]
    fn test_bundle_category_is_case_insensitive() {
        let book = CostBook::builtin();
        let standard = book.spec_bundle(SpecTier::Standard).unwrap();
        assert_eq!(standard.entry_for("windows").unwrap().unit_cost, 385.0);
        assert!(book
            .spec_bundle(SpecTier::Premium)
            .unwrap()
            .entry_for("Flooring_Carpet")
            .is_none());
    }

    #[test]
    fn test_from_json_rejects_negative_cost() {
        let json = r#"{"catalog": [{"trade": "Concrete", "item": "Slab", "uom": "SF", "unit_cost": -1}], "bundles": []}"#;
        assert!(matches!(CostBook::from_json(json), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "catalog": [{"trade": "Openings", "item": "Doors", "uom": "EA", "unit_cost": 310}],
            "bundles": [{"tier": "Luxury", "entries": [{"category": "Doors", "item": "Pivot door", "uom": "EA", "unit_cost": 4200}]}]
        }"#;
        let book = CostBook::from_json(json).unwrap();
        assert_eq!(book.unit_cost("Openings", "Doors"), Some(310.0));
        assert!(book.spec_bundle(SpecTier::Standard).is_none());
        assert_eq!(
            book.spec_bundle(SpecTier::Luxury).unwrap().entries[0].item,
            "Pivot door"
        );
    }
}
