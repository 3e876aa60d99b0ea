//! Pricing options and configuration.

use crate::error::{Error, Result};
use crate::model::Markups;

/// Unit cost used when no bundle or catalog entry prices a quantity.
pub const DEFAULT_PLACEHOLDER_UNIT_COST: f64 = 100.0;

/// Options for pricing an estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingOptions {
    /// Overhead, profit and contingency percentages
    pub markups: Markups,

    /// Base unit cost for unpriced quantities
    pub placeholder_unit_cost: f64,

    /// Testing and inspections allowance
    pub testing_allowance: f64,

    /// Miscellaneous materials allowance
    pub misc_allowance: f64,

    /// Share of the subtotal budgeted for permits when the factor has no flat fee
    pub permit_rate: f64,
}

impl PricingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all markups at once.
    pub fn with_markups(mut self, markups: Markups) -> Self {
        self.markups = markups;
        self
    }

    /// Set overhead percentage (10.0 = 10%).
    pub fn with_overhead(mut self, pct: f64) -> Self {
        self.markups.overhead_pct = pct;
        self
    }

    /// Set profit percentage.
    pub fn with_profit(mut self, pct: f64) -> Self {
        self.markups.profit_pct = pct;
        self
    }

    /// Set contingency percentage.
    pub fn with_contingency(mut self, pct: f64) -> Self {
        self.markups.contingency_pct = pct;
        self
    }

    pub fn with_placeholder_unit_cost(mut self, cost: f64) -> Self {
        self.placeholder_unit_cost = cost;
        self
    }

    pub fn with_testing_allowance(mut self, amount: f64) -> Self {
        self.testing_allowance = amount;
        self
    }

    pub fn with_misc_allowance(mut self, amount: f64) -> Self {
        self.misc_allowance = amount;
        self
    }

    pub fn with_permit_rate(mut self, rate: f64) -> Self {
        self.permit_rate = rate;
        self
    }

    /// Reject negative or non-finite values.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("overhead", self.markups.overhead_pct),
            ("profit", self.markups.profit_pct),
            ("contingency", self.markups.contingency_pct),
            ("placeholder unit cost", self.placeholder_unit_cost),
            ("testing allowance", self.testing_allowance),
            ("misc allowance", self.misc_allowance),
            ("permit rate", self.permit_rate),
        ];
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }
        Ok(())
    }
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            markups: Markups::default(),
            placeholder_unit_cost: DEFAULT_PLACEHOLDER_UNIT_COST,
            testing_allowance: 2500.0,
            misc_allowance: 1500.0,
            permit_rate: 0.02,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_options_builder() {
        let options = PricingOptions::new()
            .with_overhead(12.0)
            .with_contingency(0.0)
            .with_placeholder_unit_cost(250.0);

        assert_eq!(options.markups.overhead_pct, 12.0);
        assert_eq!(options.markups.profit_pct, 10.0);
        assert_eq!(options.markups.contingency_pct, 0.0);
        assert_eq!(options.placeholder_unit_cost, 250.0);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_negative_markup_rejected() {
        let options = PricingOptions::new().with_profit(-5.0);
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }
}
