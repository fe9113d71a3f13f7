//! Submit Order Use Case

use std::sync::Arc;

use thiserror::Error;

use crate::application::dto::{CreateOrderRequest, SubmitOrderResponse, ValidationError};
use crate::application::services::{OrderQueue, QueueError};
use crate::domain::order_execution::{Order, OrderError, OrderRepository};
use crate::application::metrics;

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitOrderError {
    /// Request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Order could not be created or stored.
    #[error(transparent)]
    Order(#[from] OrderError),
    /// Queue refused the order.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Use case for accepting swap orders.
///
/// Validates the request, stores the order as `pending` and hands it to the
/// queue. Processing happens asynchronously.
pub struct SubmitOrderUseCase<O: OrderRepository + 'static> {
    orders: Arc<O>,
    queue: OrderQueue<O>,
}

impl<O: OrderRepository + 'static> SubmitOrderUseCase<O> {
    /// Create a new `SubmitOrderUseCase`.
    pub const fn new(orders: Arc<O>, queue: OrderQueue<O>) -> Self {
        Self { orders, queue }
    }

    /// Execute the use case.
    ///
    /// # Errors
    ///
    /// Returns error if validation fails, the order cannot be stored, or the
    /// queue is shutting down.
    pub async fn execute(
        &self,
        request: CreateOrderRequest,
    ) -> Result<SubmitOrderResponse, SubmitOrderError> {
        let command = request.validate()?;
        if !self.queue.is_accepting() {
            return Err(QueueError::ShuttingDown.into());
        }
        let order = Order::new(command)?;
        let response = SubmitOrderResponse {
            order_id: order.id().to_string(),
            status: order.status(),
        };

        self.orders.save(&order).await?;
        tracing::info!(
            order_id = %order.id(),
            kind = %order.kind(),
            token_in = order.token_in(),
            token_out = order.token_out(),
            amount_in = %order.amount_in(),
            "Order accepted"
        );
        self.queue.enqueue(order)?;
        metrics::record_order_submitted();

        Ok(response)
    }
}
