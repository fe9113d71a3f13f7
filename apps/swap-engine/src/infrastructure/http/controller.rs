//! HTTP Controller (Driver Adapter)
//!
//! Axum-based REST API that delegates to the submit use case, the order
//! store and the queue.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::application::dto::{CreateOrderRequest, OrderDto, SubmitOrderResponse, ValidationError};
use crate::application::services::{OrderQueue, QueueStats, StatusHub};
use crate::application::use_cases::SubmitOrderUseCase;
use crate::domain::order_execution::OrderRepository;
use crate::domain::shared::OrderId;
use crate::infrastructure::config::Container;
use crate::infrastructure::metrics::get_metrics_handle;

use super::request::ListOrdersQuery;
use super::response::{ApiError, HealthResponse};
use super::websocket::stream_order;

/// Application state shared across handlers.
pub struct AppState<O: OrderRepository + 'static> {
    /// Use case for submitting orders.
    pub submit_order: Arc<SubmitOrderUseCase<O>>,
    /// Order queue, for stats and job lookups.
    pub queue: OrderQueue<O>,
    /// Order store for queries.
    pub orders: Arc<O>,
    /// Status hub for live streams.
    pub hub: StatusHub,
    /// Application version.
    pub version: String,
    /// Process start, for uptime.
    pub started_at: Instant,
}

impl<O: OrderRepository + 'static> AppState<O> {
    /// Build state from a wired container.
    pub fn from_container(container: &Container<O>, version: impl Into<String>) -> Self {
        Self {
            submit_order: container.submit_order_use_case(),
            queue: container.queue(),
            orders: container.orders(),
            hub: container.hub(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }
}

impl<O: OrderRepository + 'static> Clone for AppState<O> {
    fn clone(&self) -> Self {
        Self {
            submit_order: Arc::clone(&self.submit_order),
            queue: self.queue.clone(),
            orders: Arc::clone(&self.orders),
            hub: self.hub.clone(),
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<O: OrderRepository + 'static>(state: AppState<O>) -> Router {
    Router::new()
        .route("/health", get(health_check::<O>))
        .route("/metrics", get(metrics))
        .route("/api/orders", get(list_orders::<O>))
        .route("/api/orders/execute", post(submit_order::<O>))
        .route("/api/orders/{id}", get(get_order::<O>))
        .route("/api/orders/{id}/stream", get(stream_order::<O>))
        .route("/api/queue/stats", get(queue_stats::<O>))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<O: OrderRepository + 'static>(
    State(state): State<AppState<O>>,
) -> impl IntoResponse {
    let status = if state.queue.is_accepting() {
        "healthy"
    } else {
        "draining"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        queue: state.queue.stats(),
    })
}

/// Prometheus metrics endpoint.
async fn metrics() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

/// Submit order endpoint.
async fn submit_order<O: OrderRepository + 'static>(
    State(state): State<AppState<O>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitOrderResponse>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::BadRequest(ValidationError::Malformed(rejection.body_text()).to_string())
    })?;

    let response = state.submit_order.execute(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Order lookup endpoint.
async fn get_order<O: OrderRepository + 'static>(
    State(state): State<AppState<O>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDto>, ApiError> {
    let order = state
        .orders
        .find_by_id(&OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))?;
    Ok(Json(OrderDto::from_order(&order)))
}

/// Order listing endpoint, newest first.
async fn list_orders<O: OrderRepository + 'static>(
    State(state): State<AppState<O>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderDto>>, ApiError> {
    let filter = query
        .status_filter()
        .map_err(|raw| ApiError::BadRequest(format!("unknown status '{raw}'")))?;

    let orders = match filter {
        Some(status) => state.orders.find_by_status(status).await?,
        None => state.orders.list().await?,
    };
    Ok(Json(orders.iter().map(OrderDto::from_order).collect()))
}

/// Queue statistics endpoint.
async fn queue_stats<O: OrderRepository + 'static>(
    State(state): State<AppState<O>>,
) -> Json<QueueStats> {
    Json(state.queue.stats())
}
