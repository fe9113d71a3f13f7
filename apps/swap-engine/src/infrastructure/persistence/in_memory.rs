//! In-memory order repository.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::order_execution::aggregate::Order;
use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::repository::OrderRepository;
use crate::domain::order_execution::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// In-memory implementation of `OrderRepository`.
///
/// Orders live for the lifetime of the process. Each save replaces the
/// stored snapshot.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<OrderId, Order>>,
}

impl InMemoryOrderRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of orders in the repository.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(a.id()))
    });
    orders
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        self.orders.write().insert(order.id().clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.orders.read().get(id).cloned())
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        let matching = self
            .orders
            .read()
            .values()
            .filter(|o| o.status() == status)
            .cloned()
            .collect();
        Ok(newest_first(matching))
    }

    async fn list(&self) -> Result<Vec<Order>, OrderError> {
        let all = self.orders.read().values().cloned().collect();
        Ok(newest_first(all))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CreateOrderCommand, OrderKind};
    use rust_decimal_macros::dec;

    fn order(token_in: &str) -> Order {
        Order::new(CreateOrderCommand {
            kind: OrderKind::Market,
            token_in: token_in.to_string(),
            token_out: "USDC".to_string(),
            amount_in: dec!(1),
            slippage_pct: dec!(1),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn save_and_find() {
        let repo = InMemoryOrderRepository::new();
        let order = order("SOL");
        repo.save(&order).await.unwrap();

        let found = repo.find_by_id(order.id()).await.unwrap();
        assert_eq!(found, Some(order));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn save_replaces_snapshot() {
        let repo = InMemoryOrderRepository::new();
        let mut order = order("SOL");
        repo.save(&order).await.unwrap();
        order.advance(OrderStatus::Routing).unwrap();
        repo.save(&order).await.unwrap();

        let found = repo.find_by_id(order.id()).await.unwrap().unwrap();
        assert_eq!(found.status(), OrderStatus::Routing);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn find_missing_returns_none() {
        let repo = InMemoryOrderRepository::new();
        assert!(repo.find_by_id(&OrderId::new("nope")).await.unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn find_by_status_filters() {
        let repo = InMemoryOrderRepository::new();
        let pending = order("SOL");
        let mut routing = order("JUP");
        routing.advance(OrderStatus::Routing).unwrap();
        repo.save(&pending).await.unwrap();
        repo.save(&routing).await.unwrap();

        let found = repo.find_by_status(OrderStatus::Routing).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), routing.id());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = InMemoryOrderRepository::new();
        let first = order("SOL");
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = order("JUP");
        repo.save(&first).await.unwrap();
        repo.save(&second).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[0].id(), second.id());
        assert_eq!(listed[1].id(), first.id());
    }
}
