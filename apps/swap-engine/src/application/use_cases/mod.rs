//! Application Use Cases
//!
//! Use cases orchestrate domain logic to fulfill application requirements.

mod submit_order;

pub use submit_order::{SubmitOrderError, SubmitOrderUseCase};
