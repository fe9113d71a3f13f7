//! Venue Routing Bounded Context
//!
//! Quotes, venue selection and settlement outcomes for swaps across
//! multiple liquidity sources.

pub mod services;
pub mod value_objects;

pub use services::PricingService;
pub use value_objects::{BestQuote, ExecutionResult, Quote, Settlement, Venue};
