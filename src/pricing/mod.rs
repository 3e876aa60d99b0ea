//! Pricing: reference data, regional factors and the estimate engine.
//!
//! Reference data is read-only and shared behind `Arc`, so one engine can
//! price many runs concurrently.

mod catalog;
mod engine;
mod options;
mod regional;

pub use catalog::{BundleEntry, CatalogEntry, CatalogSource, CostBook, SpecBundle};
pub use engine::{PricingEngine, ESTIMATE_VERSION};
pub use options::{PricingOptions, DEFAULT_PLACEHOLDER_UNIT_COST};
pub use regional::{RegionalFactorResolver, RegionalSource, RegionalTable};
