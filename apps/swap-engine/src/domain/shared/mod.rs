//! Shared Kernel
//!
//! Types shared by the order execution and venue routing contexts.

pub mod value_objects;

pub use value_objects::{OrderId, TxHash};
