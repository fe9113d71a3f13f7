//! Status Hub
//!
//! Per-order publish/subscribe registry. Transport adapters subscribe to an
//! order id and receive every status event published for it afterwards.
//! There is no history: a late subscriber only sees future events.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::order_execution::StatusEvent;
use crate::domain::shared::OrderId;

/// Why a subscriber could not take an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The subscriber's sink is gone; it will be removed.
    #[error("subscriber closed")]
    Closed,
    /// The subscriber failed for this event only.
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Subscriber callback.
pub type StatusCallback = Arc<dyn Fn(&StatusEvent) -> Result<(), DeliveryError> + Send + Sync>;

type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    subscribers: RwLock<HashMap<OrderId, Vec<(SubscriberId, StatusCallback)>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn remove(&self, order_id: &OrderId, id: SubscriberId) {
        let mut subscribers = self.subscribers.write();
        if let Some(list) = subscribers.get_mut(order_id) {
            list.retain(|(sid, _)| *sid != id);
            if list.is_empty() {
                subscribers.remove(order_id);
            }
        }
    }
}

/// Handle for one subscription. Dropping it unsubscribes.
pub struct Subscription {
    order_id: OrderId,
    id: SubscriberId,
    registry: Weak<Registry>,
    active: AtomicBool,
}

impl Subscription {
    /// Order this subscription listens to.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Stop receiving events. Calling it again has no effect.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.order_id, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("order_id", &self.order_id)
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::Acquire))
            .finish()
    }
}

/// Per-order status fan-out.
#[derive(Clone, Default)]
pub struct StatusHub {
    registry: Arc<Registry>,
}

impl StatusHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every future event of `order_id`.
    pub fn subscribe<F>(&self, order_id: &OrderId, callback: F) -> Subscription
    where
        F: Fn(&StatusEvent) -> Result<(), DeliveryError> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .subscribers
            .write()
            .entry(order_id.clone())
            .or_default()
            .push((id, Arc::new(callback)));

        tracing::debug!(order_id = %order_id, subscriber = id, "Subscriber added");

        Subscription {
            order_id: order_id.clone(),
            id,
            registry: Arc::downgrade(&self.registry),
            active: AtomicBool::new(true),
        }
    }

    /// Subscribe through an unbounded channel.
    ///
    /// The receiver ends once the subscription is removed, either by
    /// [`Subscription::unsubscribe`] or by [`StatusHub::close`].
    pub fn subscribe_channel(
        &self,
        order_id: &OrderId,
    ) -> (Subscription, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(order_id, move |event| {
            tx.send(event.clone()).map_err(|_| DeliveryError::Closed)
        });
        (subscription, rx)
    }

    /// Deliver `event` to every subscriber of its order.
    ///
    /// Delivery is synchronous. A failing or panicking subscriber does not
    /// prevent the others from receiving the event; closed subscribers are
    /// removed.
    /// Returns the number of successful deliveries.
    pub fn publish(&self, event: &StatusEvent) -> usize {
        let callbacks: Vec<(SubscriberId, StatusCallback)> = self
            .registry
            .subscribers
            .read()
            .get(&event.order_id)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(event)))
                .unwrap_or_else(|_| Err(DeliveryError::Failed("subscriber panicked".to_string())));
            match outcome {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Closed) => {
                    tracing::debug!(order_id = %event.order_id, subscriber = id, "Pruning closed subscriber");
                    self.registry.remove(&event.order_id, id);
                }
                Err(DeliveryError::Failed(reason)) => {
                    tracing::warn!(
                        order_id = %event.order_id,
                        subscriber = id,
                        status = %event.status,
                        reason = %reason,
                        "Status delivery failed"
                    );
                }
            }
        }
        delivered
    }

    /// Remove every subscriber of `order_id`.
    pub fn close(&self, order_id: &OrderId) {
        if let Some(list) = self.registry.subscribers.write().remove(order_id) {
            tracing::debug!(order_id = %order_id, subscribers = list.len(), "Subscribers closed");
        }
    }

    /// Number of subscribers for `order_id`.
    #[must_use]
    pub fn subscriber_count(&self, order_id: &OrderId) -> usize {
        self.registry
            .subscribers
            .read()
            .get(order_id)
            .map_or(0, Vec::len)
    }

    /// Number of subscribers across all orders.
    #[must_use]
    pub fn total_subscribers(&self) -> usize {
        self.registry.subscribers.read().values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for StatusHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusHub")
            .field("subscribers", &self.total_subscribers())
            .finish()
    }
}
