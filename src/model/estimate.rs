//! Estimates, line items and the markup roll-up.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::quantity::Confidence;
use super::regional::RegionalFactor;
use crate::error::Diagnostic;

/// Round to cents by scaling the binary value by 100 and rounding half away
/// from zero. Decimal midpoints with no exact binary form, such as `1.005`,
/// can land below the midpoint once scaled and round down.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Finish-quality level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpecTier {
    #[default]
    Standard,
    Premium,
    Luxury,
}

impl SpecTier {
    pub fn as_str(self) -> &'static str {
        match self {
            SpecTier::Standard => "Standard",
            SpecTier::Premium => "Premium",
            SpecTier::Luxury => "Luxury",
        }
    }

    /// This tier followed by the tiers below it, highest first.
    pub fn and_below(self) -> &'static [SpecTier] {
        match self {
            SpecTier::Standard => &[SpecTier::Standard],
            SpecTier::Premium => &[SpecTier::Premium, SpecTier::Standard],
            SpecTier::Luxury => &[SpecTier::Luxury, SpecTier::Premium, SpecTier::Standard],
        }
    }

    /// Parse a tier name; unknown names fall back to Standard.
    pub fn parse_lenient(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl FromStr for SpecTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SpecTier::Standard),
            "premium" => Ok(SpecTier::Premium),
            "luxury" => Ok(SpecTier::Luxury),
            other => Err(format!("unknown spec tier: {}", other)),
        }
    }
}

impl fmt::Display for SpecTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which price source a line item used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingSource {
    SpecTier,
    Catalog,
    Placeholder,
}

/// A priced line of the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub wbs: String,
    pub assembly: String,
    pub description: String,
    pub category: String,
    pub uom: String,
    pub qty: f64,
    pub qty_confidence: Confidence,
    pub needs_rfi: bool,
    /// Post-regional unit cost at full precision
    pub unit_cost: f64,
    /// `round2(qty * unit_cost)`
    pub ext_cost: f64,
    pub trade: String,
    pub alt_group: Option<String>,
    pub pricing_source: PricingSource,
    pub source_page: u32,
}

impl LineItem {
    /// True when the line was priced without a catalog or bundle match.
    pub fn is_fallback(&self) -> bool {
        self.pricing_source == PricingSource::Placeholder
    }
}

/// Markup percentages, in percent units (10.0 = 10%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Markups {
    pub overhead_pct: f64,
    pub profit_pct: f64,
    pub contingency_pct: f64,
}

impl Default for Markups {
    fn default() -> Self {
        Self {
            overhead_pct: 10.0,
            profit_pct: 10.0,
            contingency_pct: 5.0,
        }
    }
}

/// Cost roll-up. Each amount is rounded before feeding the next step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateSummary {
    pub subtotal: f64,
    pub overhead_pct: f64,
    pub overhead_amt: f64,
    pub profit_pct: f64,
    pub profit_amt: f64,
    pub total: f64,
    pub contingency_pct: f64,
    pub contingency_amt: f64,
    pub grand_total: f64,
}

impl EstimateSummary {
    /// Roll up line items in the fixed order subtotal, overhead, profit,
    /// total, contingency, grand total.
    pub fn compute(line_items: &[LineItem], markups: &Markups) -> Self {
        let subtotal = round2(line_items.iter().map(|li| li.ext_cost).sum());
        Self::from_subtotal(subtotal, markups)
    }

    pub fn from_subtotal(subtotal: f64, markups: &Markups) -> Self {
        let subtotal = round2(subtotal);
        let overhead_amt = round2(subtotal * markups.overhead_pct / 100.0);
        let profit_amt = round2(subtotal * markups.profit_pct / 100.0);
        let total = round2(subtotal + overhead_amt + profit_amt);
        let contingency_amt = round2(total * markups.contingency_pct / 100.0);
        let grand_total = round2(total + contingency_amt);

        Self {
            subtotal,
            overhead_pct: markups.overhead_pct,
            overhead_amt,
            profit_pct: markups.profit_pct,
            profit_amt,
            total,
            contingency_pct: markups.contingency_pct,
            contingency_amt,
            grand_total,
        }
    }
}

/// A budget line reported beside the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    pub name: String,
    pub amount: f64,
}

impl Allowance {
    pub fn new(name: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            amount: round2(amount),
        }
    }
}

/// A priced estimate for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub version: u32,
    pub spec_tier: SpecTier,
    pub regional_factor: RegionalFactor,
    pub line_items: Vec<LineItem>,
    pub summary: EstimateSummary,
    pub allowances: Vec<Allowance>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Estimate {
    /// Line items grouped by trade, ordered by trade name.
    pub fn by_trade(&self) -> BTreeMap<&str, Vec<&LineItem>> {
        let mut groups: BTreeMap<&str, Vec<&LineItem>> = BTreeMap::new();
        for item in &self.line_items {
            groups.entry(item.trade.as_str()).or_default().push(item);
        }
        groups
    }

    /// Line items grouped by alternate tag.
    pub fn alternates(&self) -> BTreeMap<&str, Vec<&LineItem>> {
        let mut groups: BTreeMap<&str, Vec<&LineItem>> = BTreeMap::new();
        for item in &self.line_items {
            if let Some(group) = item.alt_group.as_deref() {
                groups.entry(group).or_default().push(item);
            }
        }
        groups
    }

    /// Lines that need a request for information.
    pub fn rfi_lines(&self) -> impl Iterator<Item = &LineItem> {
        self.line_items.iter().filter(|li| li.needs_rfi)
    }

    /// Sum of allowances.
    pub fn allowance_total(&self) -> f64 {
        round2(self.allowances.iter().map(|a| a.amount).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(trade: &str, ext: f64) -> LineItem {
        LineItem {
            wbs: "01.01".to_string(),
            assembly: trade.to_string(),
            description: "item".to_string(),
            category: "equipment".to_string(),
            uom: "EA".to_string(),
            qty: 1.0,
            qty_confidence: Confidence::Medium,
            needs_rfi: false,
            unit_cost: ext,
            ext_cost: ext,
            trade: trade.to_string(),
            alt_group: None,
            pricing_source: PricingSource::Catalog,
            source_page: 1,
        }
    }

    #[test]
    fn test_round2_midpoints() {
        // Exact binary midpoints round away from zero.
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(2.675), 2.68);
        // 1.005 scales to 100.49999999999999.
        assert_eq!(round2(1.005), 1.0);
        assert_eq!(round2(2.344), 2.34);
    }

    #[test]
    fn test_summary_order() {
        let items = vec![line("Openings", 1000.0), line("Mechanical", 500.0)];
        let summary = EstimateSummary::compute(&items, &Markups::default());

        assert_eq!(summary.subtotal, 1500.0);
        assert_eq!(summary.overhead_amt, 150.0);
        assert_eq!(summary.profit_amt, 150.0);
        assert_eq!(summary.total, 1800.0);
        assert_eq!(summary.contingency_amt, 90.0);
        assert_eq!(summary.grand_total, 1890.0);
    }

    #[test]
    fn test_empty_summary_is_zero() {
        let summary = EstimateSummary::compute(&[], &Markups::default());
        assert_eq!(summary.subtotal, 0.0);
        assert_eq!(summary.grand_total, 0.0);
    }

    #[test]
    fn test_spec_tier_lenient_parse() {
        assert_eq!(SpecTier::parse_lenient("premium"), SpecTier::Premium);
        assert_eq!(SpecTier::parse_lenient("LUXURY"), SpecTier::Luxury);
        assert_eq!(SpecTier::parse_lenient("gold"), SpecTier::Standard);
    }
}
