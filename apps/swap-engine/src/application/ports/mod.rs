//! Application Ports (Driven)
//!
//! Ports define interfaces for interacting with external systems.
//! The order store port lives with its aggregate in the domain layer.

mod simulation_port;

pub use simulation_port::{Cancelled, Delay, RandomSource};
