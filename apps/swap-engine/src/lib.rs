// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Swap Engine - Rust Core Library
//!
//! Accepts swap orders, routes each to the venue with the best net output,
//! simulates settlement and streams every status transition to subscribers.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Core business logic
//!   - `order_execution`: Order aggregate, status lifecycle, status events
//!   - `venue_routing`: Venues, quotes, settlement results, pricing
//!
//! - **Application**: Orchestration
//!   - `ports`: Randomness and delay sources
//!   - `services`: `VenueRouter`, `ExecutionCoordinator`, `OrderQueue`, `StatusHub`
//!   - `use_cases`: `SubmitOrder`
//!   - `dto`: Request validation and API snapshots
//!
//! - **Infrastructure**: Adapters
//!   - `http`: REST and WebSocket API
//!   - `persistence`: In-memory order store
//!   - `simulation`: RNG and timer adapters
//!   - `config`, `metrics`, `telemetry`: Cross-cutting concerns

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Services, use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::order_execution::{Order, OrderKind, OrderStatus, StatusEvent, StatusPayload};
pub use domain::shared::{OrderId, TxHash};
pub use domain::venue_routing::{BestQuote, ExecutionResult, Quote, Settlement, Venue};

// Application re-exports
pub use application::dto::{CreateOrderRequest, OrderDto, SubmitOrderResponse, ValidationError};
pub use application::services::{
    ExecutionCoordinator, OrderQueue, QueueConfig, QueueStats, RetryPolicy, StatusHub,
    VenueRouter, VenueRouterConfig,
};
pub use application::use_cases::{SubmitOrderError, SubmitOrderUseCase};

// Infrastructure re-exports
pub use infrastructure::config::{Container, EngineConfig};
pub use infrastructure::http::{AppState, create_router};
pub use infrastructure::persistence::InMemoryOrderRepository;
