//! HTTP/WebSocket API adapter.
//!
//! Inbound adapter exposing order submission, lookup, live status streams,
//! queue statistics, health and metrics.

mod controller;
mod request;
mod response;
mod server;
mod websocket;

pub use controller::{AppState, create_router};
pub use request::ListOrdersQuery;
pub use response::{ApiError, ErrorResponse, HealthResponse};
pub use server::{HttpServer, HttpServerError};
pub use websocket::stream_order;
