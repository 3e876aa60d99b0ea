//! Regional factor data and resolution.
//!
//! A factor is resolved in three layers: the base for the region, then a ZIP
//! override, else a CBSA override. Overrides are partial, so any field they
//! leave unset keeps the base value. A key that matches nothing resolves to
//! [`RegionalFactor::neutral`]; lookups never fail.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::model::{FactorOverride, FactorSource, LocationKey, Permit, RegionalFactor};

/// Read-only source of regional reference data.
pub trait RegionalSource: Send + Sync {
    fn zip_override(&self, zip: &str) -> Option<&FactorOverride>;

    fn cbsa_override(&self, cbsa: &str) -> Option<&FactorOverride>;

    /// Base factor for a named region.
    fn region_default(&self, region: &str) -> Option<&RegionalFactor>;

    /// Region a ZIP code belongs to.
    fn region_for_zip(&self, zip: &str) -> Option<&str>;

    /// Region a CBSA belongs to.
    fn region_for_cbsa(&self, cbsa: &str) -> Option<&str>;
}

/// In-memory regional tables, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionalTable {
    #[serde(default)]
    pub regions: BTreeMap<String, RegionalFactor>,
    #[serde(default)]
    pub zip_overrides: BTreeMap<String, FactorOverride>,
    #[serde(default)]
    pub cbsa_overrides: BTreeMap<String, FactorOverride>,
    #[serde(default)]
    pub zip_regions: BTreeMap<String, String>,
    #[serde(default)]
    pub cbsa_regions: BTreeMap<String, String>,
}

fn region(name: &str, labor: f64, material: f64, demo: f64, permit: Permit) -> (String, RegionalFactor) {
    (
        name.to_string(),
        RegionalFactor {
            region: name.to_string(),
            labor_idx: labor,
            material_idx: material,
            demo_idx: demo,
            permit,
            effective_date: None,
            source: FactorSource::Region,
        },
    )
}

fn pairs(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl RegionalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in reference data for the Southeast.
    pub fn builtin() -> Self {
        let regions = [
            region("Atlanta_GA", 1.02, 1.00, 1.05, Permit::Index(1.10)),
            region("Madison_GA", 0.92, 0.95, 1.00, Permit::FlatFee(450.0)),
            region("Miami_FL", 1.08, 1.12, 1.00, Permit::FlatFee(600.0)),
            region("Raleigh_NC", 0.98, 1.00, 1.00, Permit::FlatFee(500.0)),
        ]
        .into_iter()
        .collect();

        let zip_overrides = [
            ("30301", FactorOverride::default().labor(1.15).material(1.05)),
            (
                "30303",
                FactorOverride::default()
                    .labor(1.05)
                    .material(1.08)
                    .permit(Permit::FlatFee(550.0)),
            ),
            (
                "30327",
                FactorOverride::default()
                    .labor(1.15)
                    .material(1.20)
                    .permit(Permit::FlatFee(650.0)),
            ),
            ("30350", FactorOverride::default().labor(1.12).material(1.04)),
            ("30518", FactorOverride::default().labor(1.06).material(1.01)),
        ]
        .into_iter()
        .map(|(zip, ov)| (zip.to_string(), ov))
        .collect();

        let cbsa_overrides = [
            ("12060", FactorOverride::default().labor(1.08).material(1.02)),
            ("31420", FactorOverride::default().labor(0.92).material(0.98)),
            ("46660", FactorOverride::default().labor(0.88).material(0.96)),
        ]
        .into_iter()
        .map(|(cbsa, ov)| (cbsa.to_string(), ov))
        .collect();

        Self {
            regions,
            zip_overrides,
            cbsa_overrides,
            zip_regions: pairs(&[
                ("30301", "Atlanta_GA"),
                ("30303", "Atlanta_GA"),
                ("30327", "Atlanta_GA"),
                ("30350", "Atlanta_GA"),
                ("30518", "Atlanta_GA"),
                ("30601", "Madison_GA"),
                ("33139", "Miami_FL"),
                ("27601", "Raleigh_NC"),
            ]),
            cbsa_regions: pairs(&[("12060", "Atlanta_GA")]),
        }
    }

    /// Parse tables from JSON and validate them.
    ///
    /// Region entries take their name from the map key.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut table: Self = serde_json::from_str(json)?;
        for (name, factor) in table.regions.iter_mut() {
            factor.region = name.clone();
            factor.source = FactorSource::Region;
        }
        table.validate()?;
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        let check = |what: &str, value: Option<f64>| match value {
            Some(v) if !v.is_finite() || v <= 0.0 => {
                Err(Error::Config(format!("invalid index {} for {}", v, what)))
            }
            _ => Ok(()),
        };
        for (name, f) in &self.regions {
            check(name, Some(f.labor_idx))?;
            check(name, Some(f.material_idx))?;
            check(name, Some(f.demo_idx))?;
        }
        for (key, ov) in self.zip_overrides.iter().chain(self.cbsa_overrides.iter()) {
            check(key, ov.labor_idx)?;
            check(key, ov.material_idx)?;
            check(key, ov.demo_idx)?;
        }
        for (key, name) in self.zip_regions.iter().chain(self.cbsa_regions.iter()) {
            if !self.regions.contains_key(name) {
                return Err(Error::Config(format!("{} maps to unknown region {}", key, name)));
            }
        }
        Ok(())
    }
}

impl RegionalSource for RegionalTable {
    fn zip_override(&self, zip: &str) -> Option<&FactorOverride> {
        self.zip_overrides.get(zip)
    }

    fn cbsa_override(&self, cbsa: &str) -> Option<&FactorOverride> {
        self.cbsa_overrides.get(cbsa)
    }

    fn region_default(&self, region: &str) -> Option<&RegionalFactor> {
        self.regions.get(region)
    }

    fn region_for_zip(&self, zip: &str) -> Option<&str> {
        self.zip_regions.get(zip).map(String::as_str)
    }

    fn region_for_cbsa(&self, cbsa: &str) -> Option<&str> {
        self.cbsa_regions.get(cbsa).map(String::as_str)
    }
}

/// Resolves the active [`RegionalFactor`] for a location.
#[derive(Clone)]
pub struct RegionalFactorResolver {
    source: Arc<dyn RegionalSource>,
    default_region: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RegionalFactorResolver {
    pub fn new(source: Arc<dyn RegionalSource>) -> Self {
        Self {
            source,
            default_region: None,
        }
    }

    /// Region used as the base when the key names none and its ZIP and CBSA
    /// are unmapped.
    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = Some(region.into());
        self
    }

    pub fn default_region(&self) -> Option<&str> {
        self.default_region.as_deref()
    }

    /// Resolve a factor, returning the misses met on the way.
    pub fn resolve(&self, key: &LocationKey) -> (RegionalFactor, Vec<Diagnostic>) {
        let zip = present(&key.zip);
        let cbsa = present(&key.cbsa);
        let named = present(&key.region);
        let subject = key.to_string();
        let mut diagnostics = Vec::new();
        let mut miss = |message: String| {
            log::info!("Regional lookup miss for {}: {}", subject, message);
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::RegionalLookupMiss,
                subject.clone(),
                message,
            ));
        };

        if let Some(name) = named {
            if self.source.region_default(name).is_none() {
                miss(format!("unknown region {}", name));
            }
        }

        let zip_region = zip.and_then(|z| self.source.region_for_zip(z));
        let cbsa_region = cbsa.and_then(|c| self.source.region_for_cbsa(c));
        let base = [named, zip_region, cbsa_region, self.default_region.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|name| self.source.region_default(name));

        let mut factor = match base {
            Some(base) => RegionalFactor {
                source: FactorSource::Region,
                ..base.clone()
            },
            None => RegionalFactor::neutral(),
        };

        let zip_override = zip.and_then(|z| self.source.zip_override(z));
        let cbsa_override = cbsa.and_then(|c| self.source.cbsa_override(c));
        if let Some(ov) = zip_override {
            factor = factor.overlay(ov, FactorSource::Zip);
        } else if let Some(ov) = cbsa_override {
            factor = factor.overlay(ov, FactorSource::Cbsa);
        }

        if let Some(z) = zip {
            if zip_override.is_none() && zip_region.is_none() {
                miss(format!("no regional data for ZIP {}", z));
            }
        }
        if let Some(c) = cbsa {
            if cbsa_override.is_none() && cbsa_region.is_none() {
                miss(format!("no regional data for CBSA {}", c));
            }
        }
        if factor.source == FactorSource::Neutral {
            miss("using neutral factor".to_string());
        }

        (factor, diagnostics)
    }
}

impl Default for RegionalFactorResolver {
    fn default() -> Self {
        Self::new(Arc::new(RegionalTable::builtin()))
    }
}

impl std::fmt::Debug for RegionalFactorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionalFactorResolver")
            .field("default_region", &self.default_region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_base() -> RegionalTable {
        let mut table = RegionalTable::new();
        table.regions.insert(
            "Test".to_string(),
            RegionalFactor {
                region: "Test".to_string(),
                ..RegionalFactor::neutral()
            },
        );
        table
            .zip_overrides
            .insert("11111".to_string(), FactorOverride::default().labor(1.15));
        table
            .zip_regions
            .insert("11111".to_string(), "Test".to_string());
        table
    }

    #[test]
    fn test_zip_override_is_partial() {
        let resolver = RegionalFactorResolver::new(Arc::new(flat_base()));
        let (factor, diagnostics) = resolver.resolve(&LocationKey::zip("11111"));

        assert_eq!(factor.labor_idx, 1.15);
        assert_eq!(factor.material_idx, 1.0);
        assert_eq!(factor.permit, Permit::FlatFee(500.0));
        assert_eq!(factor.source, FactorSource::Zip);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_zip_beats_cbsa() {
        let resolver = RegionalFactorResolver::default();
        let (factor, _) = resolver.resolve(&LocationKey::zip("30303").with_cbsa("12060"));
        assert_eq!(factor.labor_idx, 1.05);
        assert_eq!(factor.material_idx, 1.08);
        assert_eq!(factor.demo_idx, 1.05);
        assert_eq!(factor.permit, Permit::FlatFee(550.0));
        assert_eq!(factor.region, "Atlanta_GA");
    }

    #[test]
    fn test_cbsa_applies_without_zip_override() {
        let resolver = RegionalFactorResolver::default();
        let (factor, diagnostics) = resolver.resolve(&LocationKey::zip("30601").with_cbsa("12060"));
        // Madison base, CBSA multipliers
        assert_eq!(factor.region, "Madison_GA");
        assert_eq!(factor.labor_idx, 1.08);
        assert_eq!(factor.permit, Permit::FlatFee(450.0));
        assert_eq!(factor.source, FactorSource::Cbsa);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_region_base_unmodified() {
        let resolver = RegionalFactorResolver::default();
        let key = LocationKey {
            region: Some("Miami_FL".to_string()),
            ..Default::default()
        };
        let (factor, _) = resolver.resolve(&key);
        assert_eq!(factor.labor_idx, 1.08);
        assert_eq!(factor.material_idx, 1.12);
        assert_eq!(factor.source, FactorSource::Region);
    }

    #[test]
    fn test_unknown_zip_is_neutral() {
        let resolver = RegionalFactorResolver::default();
        let (factor, diagnostics) = resolver.resolve(&LocationKey::zip("99999"));
        assert_eq!(factor, RegionalFactor::neutral());
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::RegionalLookupMiss));
    }

    #[test]
    fn test_default_region_fallback() {
        let resolver = RegionalFactorResolver::default().with_default_region("Raleigh_NC");
        let (factor, diagnostics) = resolver.resolve(&LocationKey::zip("99999"));
        assert_eq!(factor.region, "Raleigh_NC");
        assert_eq!(factor.labor_idx, 0.98);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_from_json_checks_region_links() {
        let json = r#"{"zip_regions": {"10001": "NYC"}}"#;
        assert!(matches!(RegionalTable::from_json(json), Err(Error::Config(_))));

        let json = r#"{
            "regions": {"Austin_TX": {"region": "", "labor_idx": 0.97, "material_idx": 1.0,
                "demo_idx": 1.0, "permit": {"kind": "flat_fee", "value": 400}, "effective_date": "2024-01-01"}},
            "zip_regions": {"78701": "Austin_TX"}
        }"#;
        let table = RegionalTable::from_json(json).unwrap();
        assert_eq!(table.region_default("Austin_TX").unwrap().region, "Austin_TX");
        assert_eq!(table.region_for_zip("78701"), Some("Austin_TX"));
    }
}
