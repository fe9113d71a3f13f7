//! Persistence Adapters
//!
//! Implementations of the order repository port.

pub mod in_memory;

pub use in_memory::InMemoryOrderRepository;
