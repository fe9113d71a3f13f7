//! Order Execution Bounded Context
//!
//! Manages the swap order lifecycle from submission to settlement.
//!
//! # Key Concepts
//!
//! - **Order Aggregate**: The root entity enforcing forward-only status transitions
//! - **Status Events**: One event per transition, fanned out to subscribers
//! - **Repository**: Persistence port for order snapshots

pub mod aggregate;
pub mod errors;
pub mod events;
pub mod repository;
pub mod services;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, MAX_AMOUNT_IN, Order};
pub use errors::OrderError;
pub use events::{StatusEvent, StatusPayload};
pub use repository::OrderRepository;
pub use services::OrderStateMachine;
pub use value_objects::{OrderKind, OrderStatus};
