//! Value objects for venue routing.

mod execution_result;
mod quote;
mod venue;

pub use execution_result::{ExecutionResult, Settlement};
pub use quote::{BestQuote, Quote};
pub use venue::Venue;
