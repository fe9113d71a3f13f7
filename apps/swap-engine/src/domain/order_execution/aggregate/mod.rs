//! Order Aggregate
//!
//! The Order aggregate is the root entity for swap order lifecycle management.

mod order;

pub use order::{CreateOrderCommand, MAX_AMOUNT_IN, Order};
