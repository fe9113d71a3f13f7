//! Configuration Module
//!
//! Environment-driven settings and the dependency container that wires the
//! pipeline from them.

mod container;
mod settings;

pub use container::Container;
pub use settings::{
    ConfigError, EngineConfig, ExecutionSettings, QueueSettings, ServerSettings,
};
