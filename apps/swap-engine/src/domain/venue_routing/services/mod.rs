//! Venue Routing Domain Services

mod pricing;

pub use pricing::{BPS_SCALE, MIN_ADJUSTMENT_BPS, PricingService};
