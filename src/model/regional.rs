//! Regional cost factors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Flat permit fee used by the neutral factor.
pub const NEUTRAL_PERMIT_FEE: f64 = 500.0;

/// Permit cost expressed either as a multiplier or a flat fee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Permit {
    Index(f64),
    FlatFee(f64),
}

/// How the active factor was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    Zip,
    Cbsa,
    Region,
    #[default]
    Neutral,
}

/// Multipliers applied to base costs for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalFactor {
    pub region: String,
    pub labor_idx: f64,
    pub material_idx: f64,
    pub demo_idx: f64,
    pub permit: Permit,
    pub effective_date: Option<NaiveDate>,
    #[serde(default)]
    pub source: FactorSource,
}

impl RegionalFactor {
    /// All multipliers 1.0 with the default flat permit fee.
    pub fn neutral() -> Self {
        Self {
            region: "neutral".to_string(),
            labor_idx: 1.0,
            material_idx: 1.0,
            demo_idx: 1.0,
            permit: Permit::FlatFee(NEUTRAL_PERMIT_FEE),
            effective_date: None,
            source: FactorSource::Neutral,
        }
    }

    /// Combined multiplier applied to a base unit cost.
    pub fn cost_multiplier(&self) -> f64 {
        self.labor_idx * self.material_idx
    }

    /// Apply an override; unset fields keep this factor's values.
    pub fn overlay(&self, ov: &FactorOverride, source: FactorSource) -> Self {
        Self {
            region: self.region.clone(),
            labor_idx: ov.labor_idx.unwrap_or(self.labor_idx),
            material_idx: ov.material_idx.unwrap_or(self.material_idx),
            demo_idx: ov.demo_idx.unwrap_or(self.demo_idx),
            permit: ov.permit.unwrap_or(self.permit),
            effective_date: ov.effective_date.or(self.effective_date),
            source,
        }
    }
}

impl Default for RegionalFactor {
    fn default() -> Self {
        Self::neutral()
    }
}

/// A partial factor for a ZIP or CBSA.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorOverride {
    #[serde(default)]
    pub labor_idx: Option<f64>,
    #[serde(default)]
    pub material_idx: Option<f64>,
    #[serde(default)]
    pub demo_idx: Option<f64>,
    #[serde(default)]
    pub permit: Option<Permit>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

impl FactorOverride {
    pub fn labor(mut self, idx: f64) -> Self {
        self.labor_idx = Some(idx);
        self
    }

    pub fn material(mut self, idx: f64) -> Self {
        self.material_idx = Some(idx);
        self
    }

    pub fn demo(mut self, idx: f64) -> Self {
        self.demo_idx = Some(idx);
        self
    }

    pub fn permit(mut self, permit: Permit) -> Self {
        self.permit = Some(permit);
        self
    }
}

/// Location used to resolve regional factors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationKey {
    pub zip: Option<String>,
    pub cbsa: Option<String>,
    pub region: Option<String>,
}

impl LocationKey {
    pub fn zip(zip: impl Into<String>) -> Self {
        Self {
            zip: Some(zip.into()),
            ..Default::default()
        }
    }

    pub fn with_cbsa(mut self, cbsa: impl Into<String>) -> Self {
        self.cbsa = Some(cbsa.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl std::fmt::Display for LocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = [
            self.zip.as_ref().map(|z| format!("zip={}", z)),
            self.cbsa.as_ref().map(|c| format!("cbsa={}", c)),
            self.region.as_ref().map(|r| format!("region={}", r)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            f.write_str("<empty>")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_keeps_unset_fields() {
        let base = RegionalFactor::neutral();
        let ov = FactorOverride::default().labor(1.15);
        let merged = base.overlay(&ov, FactorSource::Zip);

        assert_eq!(merged.labor_idx, 1.15);
        assert_eq!(merged.material_idx, 1.0);
        assert_eq!(merged.permit, Permit::FlatFee(500.0));
        assert_eq!(merged.source, FactorSource::Zip);
    }

    #[test]
    fn test_permit_serialization() {
        let json = serde_json::to_string(&Permit::Index(1.1)).unwrap();
        assert_eq!(json, r#"{"kind":"index","value":1.1}"#);
    }

    #[test]
    fn test_location_display() {
        let key = LocationKey::zip("30301").with_cbsa("12060");
        assert_eq!(key.to_string(), "zip=30301 cbsa=12060");
        assert_eq!(LocationKey::default().to_string(), "<empty>");
    }
}
