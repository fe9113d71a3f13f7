//! Shared value objects used across bounded contexts.

mod identifiers;

pub use identifiers::{OrderId, TxHash};
