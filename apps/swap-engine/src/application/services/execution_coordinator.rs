//! Execution Coordinator
//!
//! Drives one order through `pending -> routing -> building -> submitted ->
//! confirmed`, persisting each status before publishing it. Any error along
//! the way moves the order to `failed` and is returned to the caller so the
//! queue can decide whether to retry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Cancelled, Delay};
use crate::application::services::status_hub::StatusHub;
use crate::application::services::venue_router::{RoutingError, VenueRouter};
use crate::domain::order_execution::{
    Order, OrderError, OrderRepository, OrderStatus, StatusEvent, StatusPayload,
};
use crate::domain::venue_routing::{ExecutionResult, Settlement, Venue};
use crate::application::metrics;

/// Default simulated transaction build time.
pub const DEFAULT_BUILD_DELAY: Duration = Duration::from_millis(500);

/// Errors that end an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Domain rule or order store failure.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Quoting failed.
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingError),

    /// The venue rejected the settlement.
    #[error("{reason}")]
    Settlement {
        /// Venue that failed.
        venue: Venue,
        /// Venue failure description.
        reason: String,
    },

    /// Shutdown interrupted the attempt.
    #[error("execution cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Whether the attempt ended because of cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Routing(RoutingError::Cancelled(_))
        )
    }
}

impl From<Cancelled> for ExecutionError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Attempt bookkeeping passed in by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    /// Current attempt number (1-based).
    pub attempt: u32,
    /// Whether the queue's retry policy allows another attempt after this one.
    pub retry_on_failure: bool,
}

impl AttemptContext {
    /// Single attempt without retries.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            attempt: 1,
            retry_on_failure: false,
        }
    }

    fn will_retry(self, err: &ExecutionError, cancel: &CancellationToken) -> bool {
        self.retry_on_failure && !err.is_cancelled() && !cancel.is_cancelled()
    }
}

/// A failed attempt and the retry decision announced to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct AttemptFailure {
    /// Why the attempt failed.
    pub error: ExecutionError,
    /// Whether the failure event told subscribers another attempt follows.
    pub will_retry: bool,
}

/// Per-order execution state machine.
pub struct ExecutionCoordinator<O: OrderRepository> {
    router: Arc<VenueRouter>,
    orders: Arc<O>,
    hub: StatusHub,
    delay: Arc<dyn Delay>,
    build_delay: Duration,
}

impl<O: OrderRepository> ExecutionCoordinator<O> {
    /// Create a coordinator with the default build delay.
    pub fn new(
        router: Arc<VenueRouter>,
        orders: Arc<O>,
        hub: StatusHub,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            router,
            orders,
            hub,
            delay,
            build_delay: DEFAULT_BUILD_DELAY,
        }
    }

    /// Override the build delay.
    #[must_use]
    pub const fn with_build_delay(mut self, build_delay: Duration) -> Self {
        self.build_delay = build_delay;
        self
    }

    /// Status hub events are published to.
    #[must_use]
    pub const fn hub(&self) -> &StatusHub {
        &self.hub
    }

    /// Run one attempt for `order`.
    ///
    /// The first attempt starts at `pending`; a retry restarts a failed order
    /// at `routing`.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the order to `failed`, together with the
    /// `willRetry` flag of the published failure event.
    #[tracing::instrument(
        skip(self, order, cancel),
        fields(order_id = %order.id(), attempt = ctx.attempt)
    )]
    pub async fn run(
        &self,
        order: &mut Order,
        ctx: AttemptContext,
        cancel: &CancellationToken,
    ) -> Result<Settlement, AttemptFailure> {
        let started = Instant::now();
        match self.drive(order, ctx, cancel).await {
            Ok(settlement) => {
                metrics::record_execution_duration(started.elapsed(), true);
                tracing::info!(
                    venue = %settlement.venue,
                    executed_price = %settlement.executed_price,
                    amount_out = %settlement.amount_out,
                    tx_hash = %settlement.tx_hash,
                    "Order confirmed"
                );
                Ok(settlement)
            }
            Err(error) => {
                metrics::record_execution_duration(started.elapsed(), false);
                let will_retry = ctx.will_retry(&error, cancel);
                self.fail(order, ctx.attempt, &error, will_retry).await;
                Err(AttemptFailure { error, will_retry })
            }
        }
    }

    async fn drive(
        &self,
        order: &mut Order,
        ctx: AttemptContext,
        cancel: &CancellationToken,
    ) -> Result<Settlement, ExecutionError> {
        if order.status() == OrderStatus::Failed {
            order.restart_attempt(ctx.attempt)?;
        } else {
            order.begin_attempt(ctx.attempt);
            self.orders.save(order).await?;
            self.emit(
                StatusEvent::new(order.id().clone(), OrderStatus::Pending)
                    .with_message("Order received and queued"),
            );
            order.advance(OrderStatus::Routing)?;
        }

        // Routing
        self.orders.save(order).await?;
        let routing = self
            .router
            .best_quote(order.token_in(), order.token_out(), order.amount_in(), cancel)
            .await?;
        order.record_routing(&routing)?;
        self.orders.save(order).await?;
        let venue = routing.best.venue;
        self.emit(
            StatusEvent::new(order.id().clone(), OrderStatus::Routing)
                .with_message(format!("Routing to {venue}"))
                .with_data(StatusPayload::routing(&routing)),
        );

        // Building
        order.advance(OrderStatus::Building)?;
        self.orders.save(order).await?;
        self.emit(
            StatusEvent::new(order.id().clone(), OrderStatus::Building)
                .with_message("Building transaction")
                .with_data(StatusPayload::venue(venue)),
        );
        self.delay.sleep(self.build_delay, cancel).await?;

        // Submitted
        order.advance(OrderStatus::Submitted)?;
        self.orders.save(order).await?;
        self.emit(
            StatusEvent::new(order.id().clone(), OrderStatus::Submitted)
                .with_message(format!("Transaction submitted to {venue}"))
                .with_data(StatusPayload::venue(venue)),
        );

        // Settlement
        match self.router.execute(venue, order, cancel).await {
            ExecutionResult::Settled(settlement) => {
                order.record_settlement(&settlement)?;
                // Settlement already happened; a store error cannot undo it.
                if let Err(e) = self.orders.save(order).await {
                    tracing::error!(error = %e, "Failed to persist confirmed order");
                }
                self.emit(
                    StatusEvent::new(order.id().clone(), OrderStatus::Confirmed)
                        .with_message("Swap confirmed")
                        .with_data(StatusPayload::settled(&settlement)),
                );
                Ok(settlement)
            }
            ExecutionResult::Failed { venue, reason } => {
                Err(ExecutionError::Settlement { venue, reason })
            }
        }
    }

    /// Finalize an order that will not be attempted again.
    ///
    /// Used when the queue gives up on an order outside a regular attempt,
    /// such as on shutdown. The latest stored copy is marked failed if it is
    /// not terminal yet, persisted, and announced with a final `failed`
    /// event. A confirmed order is returned untouched.
    pub async fn abandon(&self, order: Order, attempt: u32, reason: &str) -> Order {
        let mut order = match self.orders.find_by_id(order.id()).await {
            Ok(Some(stored)) => stored,
            Ok(None) => order,
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "Using queued copy of abandoned order");
                order
            }
        };
        if order.status() == OrderStatus::Confirmed {
            return order;
        }

        if !order.status().is_terminal() {
            if let Err(e) = order.fail(reason) {
                tracing::error!(order_id = %order.id(), error = %e, "Order could not be marked failed");
            }
        }
        if let Err(e) = self.orders.save(&order).await {
            tracing::error!(order_id = %order.id(), error = %e, "Failed to persist abandoned order");
        }

        tracing::warn!(order_id = %order.id(), attempt, reason, "Order abandoned");
        self.emit(
            StatusEvent::new(order.id().clone(), OrderStatus::Failed)
                .with_message("Order failed")
                .with_data(StatusPayload::failure(reason, attempt, false)),
        );
        order
    }

    async fn fail(&self, order: &mut Order, attempt: u32, err: &ExecutionError, will_retry: bool) {
        let message = err.to_string();

        if let Err(e) = order.fail(message.clone()) {
            tracing::error!(error = %e, "Order could not be marked failed");
            return;
        }
        if let Err(e) = self.orders.save(order).await {
            tracing::error!(error = %e, "Failed to persist failed order");
        }

        tracing::warn!(error = %message, will_retry, "Execution attempt failed");
        self.emit(
            StatusEvent::new(order.id().clone(), OrderStatus::Failed)
                .with_message(if will_retry {
                    "Attempt failed, retrying"
                } else {
                    "Order failed"
                })
                .with_data(StatusPayload::failure(message, attempt, will_retry)),
        );
    }

    fn emit(&self, event: StatusEvent) {
        tracing::debug!(status = %event.status, "Status changed");
        metrics::record_status_event(event.status);
        self.hub.publish(&event);
    }
}
