//! Application Services
//!
//! Application services coordinate domain logic and infrastructure adapters.
//! They differ from use cases in that they own long-running state (the queue,
//! the subscriber registry) or run as background tasks.

pub mod backoff;
pub mod execution_coordinator;
pub mod order_queue;
pub mod status_hub;
pub mod venue_router;

pub use backoff::RetryPolicy;
pub use execution_coordinator::{
    AttemptContext, AttemptFailure, DEFAULT_BUILD_DELAY, ExecutionCoordinator, ExecutionError,
};
pub use order_queue::{
    DEFAULT_CONCURRENCY, JobStatus, OrderQueue, QueueConfig, QueueError, QueueJob, QueueStats,
};
pub use status_hub::{DeliveryError, StatusCallback, StatusHub, Subscription};
pub use venue_router::{
    DEFAULT_FAILURE_RATE, RoutingError, VenueProfile, VenueRouter, VenueRouterConfig,
};
