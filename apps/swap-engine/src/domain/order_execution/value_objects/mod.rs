//! Value objects for order execution.

mod order_kind;
mod order_status;

pub use order_kind::OrderKind;
pub use order_status::OrderStatus;
