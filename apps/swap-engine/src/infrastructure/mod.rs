//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer, following
//! hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: In-memory order store
//!   - `simulation/`: Randomness and delay sources for the simulated venues
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST and WebSocket API
//!
//! - **Cross-cutting**
//!   - `config/`: Environment settings and dependency wiring
//!   - `metrics/`: Prometheus recorder and metric helpers
//!   - `telemetry/`: Tracing subscriber and OTLP export

pub mod config;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod simulation;
pub mod telemetry;
