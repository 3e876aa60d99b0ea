//! Quantity pricing and estimate roll-up.

use std::sync::Arc;

use super::catalog::{CatalogSource, CostBook};
use super::options::PricingOptions;
use crate::error::{Diagnostic, DiagnosticKind, Error};
use crate::model::{
    round2, Allowance, Estimate, EstimateSummary, LineItem, Permit, PlanGraph, PricingSource,
    Quantity, RegionalFactor, SpecTier,
};

/// Current estimate schema version.
pub const ESTIMATE_VERSION: u32 = 1;

/// Prices quantities against a catalog and a regional factor.
#[derive(Clone)]
pub struct PricingEngine {
    catalog: Arc<dyn CatalogSource>,
    options: PricingOptions,
}

/// Base price resolved for one quantity.
struct BasePrice {
    unit_cost: f64,
    description: String,
    uom: String,
    source: PricingSource,
}

impl PricingEngine {
    pub fn new(catalog: Arc<dyn CatalogSource>, options: PricingOptions) -> Self {
        Self { catalog, options }
    }

    pub fn with_options(mut self, options: PricingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PricingOptions {
        &self.options
    }

    /// Price every quantity of a plan graph.
    pub fn price_graph(&self, graph: &PlanGraph, factor: &RegionalFactor, tier: SpecTier) -> Estimate {
        self.price(&graph.quantities, factor, tier)
    }

    /// Price quantities into an estimate.
    ///
    /// A spec-tier bundle entry named by the quantity's category (or, for
    /// finishes, its item) wins over the catalog. A tier without an entry
    /// for the category uses the nearest lower tier that has one.
    /// Quantities nothing can price use the placeholder unit cost and add a
    /// `PricingResolution` diagnostic.
    pub fn price(&self, quantities: &[Quantity], factor: &RegionalFactor, tier: SpecTier) -> Estimate {
        let multiplier = factor.cost_multiplier();
        let mut diagnostics = Vec::new();

        let line_items: Vec<LineItem> = quantities
            .iter()
            .map(|q| {
                let base = self.base_price(q, tier).unwrap_or_else(|| {
                    let err = Error::PricingResolution {
                        trade: q.trade.clone(),
                        item: q.item.clone(),
                    };
                    log::warn!("{}; using placeholder unit cost", err);
                    diagnostics.push(Diagnostic::from_error(
                        DiagnosticKind::PricingResolution,
                        format!("{} p{} row {}", q.document, q.page, q.row + 1),
                        &err,
                    ));
                    BasePrice {
                        unit_cost: self.options.placeholder_unit_cost,
                        description: describe(q),
                        uom: quantity_uom(q),
                        source: PricingSource::Placeholder,
                    }
                });

                let unit_cost = base.unit_cost * multiplier;
                LineItem {
                    wbs: q.wbs.clone(),
                    assembly: q.assembly.clone(),
                    description: base.description,
                    category: q.category.clone(),
                    uom: base.uom,
                    qty: q.value,
                    qty_confidence: q.confidence(),
                    needs_rfi: q.needs_manual_review(),
                    unit_cost,
                    ext_cost: round2(q.value * unit_cost),
                    trade: q.trade.clone(),
                    alt_group: q.alt_group.clone(),
                    pricing_source: base.source,
                    source_page: q.page,
                }
            })
            .collect();

        let summary = EstimateSummary::compute(&line_items, &self.options.markups);
        let allowances = self.allowances(summary.subtotal, factor);
        log::debug!(
            "Priced {} line items at {} tier: subtotal {:.2}, grand total {:.2}",
            line_items.len(),
            tier,
            summary.subtotal,
            summary.grand_total
        );

        Estimate {
            version: ESTIMATE_VERSION,
            spec_tier: tier,
            regional_factor: factor.clone(),
            line_items,
            summary,
            allowances,
            diagnostics,
        }
    }

    fn base_price(&self, q: &Quantity, tier: SpecTier) -> Option<BasePrice> {
        let bundled = tier
            .and_below()
            .iter()
            .filter_map(|t| self.catalog.spec_bundle(*t))
            .find_map(|bundle| bundle.entry_for(&q.category).or_else(|| bundle.entry_for(&q.item)));
        if let Some(entry) = bundled {
            return Some(BasePrice {
                unit_cost: entry.unit_cost,
                description: entry.item.clone(),
                uom: entry.uom.clone(),
                source: PricingSource::SpecTier,
            });
        }

        self.catalog
            .unit_cost(&q.trade, &q.item)
            .map(|unit_cost| BasePrice {
                unit_cost,
                description: describe(q),
                uom: quantity_uom(q),
                source: PricingSource::Catalog,
            })
    }

    fn allowances(&self, subtotal: f64, factor: &RegionalFactor) -> Vec<Allowance> {
        let permits = match factor.permit {
            Permit::FlatFee(fee) => fee,
            Permit::Index(idx) => subtotal * self.options.permit_rate * idx,
        };
        vec![
            Allowance::new("Permits", permits),
            Allowance::new("Testing & Inspections", self.options.testing_allowance),
            Allowance::new("Misc Materials", self.options.misc_allowance),
        ]
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(Arc::new(CostBook::builtin()), PricingOptions::default())
    }
}

impl std::fmt::Debug for PricingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn describe(q: &Quantity) -> String {
    q.description
        .clone()
        .filter(|d| !d.trim().is_empty())
        .or_else(|| (!q.item.is_empty()).then(|| q.item.clone()))
        .unwrap_or_else(|| q.category.clone())
}

fn quantity_uom(q: &Quantity) -> String {
    q.uom.clone().unwrap_or_else(|| "EA".to_string())
}
