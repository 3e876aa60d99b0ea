//! Data model for plan sets, findings and estimates.
//!
//! These types are shared by every pipeline stage and are all serde
//! serializable, so any intermediate result can be stored or inspected.

mod estimate;
mod finding;
mod plan;
mod quantity;
mod regional;
mod table;

pub use estimate::{
    round2, Allowance, Estimate, EstimateSummary, LineItem, Markups, PricingSource, SpecTier,
};
pub use finding::{Finding, Jurisdiction, Severity, DEFAULT_CODE_SET, DEFAULT_STATE};
pub use plan::{
    ConfidenceSummary, Dimension, PlanGraph, PlanMetadata, RfiItem, ScheduleCapture,
    ScheduleCategory, Sheet, SheetDiscipline,
};
pub use quantity::{
    Confidence, OcrQuality, PageContext, Quantity, QuantitySignals, QuantitySource,
};
pub use regional::{
    FactorOverride, FactorSource, LocationKey, Permit, RegionalFactor, NEUTRAL_PERMIT_FEE,
};
pub use table::{Table, TableRow};
