//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for randomness and time
//! - **Services**: Venue router, status hub, execution coordinator, order queue
//! - **Metrics**: Metric names and recording helpers
//! - **Use Cases**: Application-specific business rules
//! - **DTOs**: Data transfer objects for API boundaries

pub mod dto;
pub mod metrics;
pub mod ports;
pub mod services;
pub mod use_cases;

pub use dto::*;
pub use ports::*;
pub use use_cases::*;
