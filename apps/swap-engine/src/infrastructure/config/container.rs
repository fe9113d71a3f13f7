//! Dependency Injection Container
//!
//! Builds the pipeline (router, status hub, coordinator, queue and submit
//! use case) from an [`EngineConfig`] and hands out shared references.

use std::sync::Arc;

use crate::application::ports::{Delay, RandomSource};
use crate::application::services::{ExecutionCoordinator, OrderQueue, StatusHub, VenueRouter};
use crate::application::use_cases::SubmitOrderUseCase;
use crate::domain::order_execution::OrderRepository;
use crate::infrastructure::config::EngineConfig;

/// Dependency injection container.
///
/// Every component shares the same store, hub and delay, so the HTTP layer
/// and the queue observe the same orders.
pub struct Container<O: OrderRepository + 'static> {
    orders: Arc<O>,
    router: Arc<VenueRouter>,
    hub: StatusHub,
    queue: OrderQueue<O>,
    submit_order: Arc<SubmitOrderUseCase<O>>,
}

impl<O: OrderRepository + 'static> Container<O> {
    /// Wire the pipeline.
    pub fn new(
        config: &EngineConfig,
        orders: Arc<O>,
        random: Arc<dyn RandomSource>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        let router = Arc::new(VenueRouter::new(
            config.execution.router_config(),
            random,
            Arc::clone(&delay),
        ));
        let hub = StatusHub::new();
        let coordinator = ExecutionCoordinator::new(
            Arc::clone(&router),
            Arc::clone(&orders),
            hub.clone(),
            Arc::clone(&delay),
        )
        .with_build_delay(config.execution.build_delay);
        let queue = OrderQueue::new(config.queue.queue_config(), coordinator, delay);
        let submit_order = Arc::new(SubmitOrderUseCase::new(Arc::clone(&orders), queue.clone()));

        Self {
            orders,
            router,
            hub,
            queue,
            submit_order,
        }
    }

    /// Get the order store.
    pub fn orders(&self) -> Arc<O> {
        Arc::clone(&self.orders)
    }

    /// Get the venue router.
    pub fn router(&self) -> Arc<VenueRouter> {
        Arc::clone(&self.router)
    }

    /// Get the status hub.
    pub fn hub(&self) -> StatusHub {
        self.hub.clone()
    }

    /// Get the order queue.
    pub fn queue(&self) -> OrderQueue<O> {
        self.queue.clone()
    }

    /// Get the submit use case.
    pub fn submit_order_use_case(&self) -> Arc<SubmitOrderUseCase<O>> {
        Arc::clone(&self.submit_order)
    }
}
