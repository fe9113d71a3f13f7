//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders.
//! Implemented by adapters in the infrastructure layer.

use async_trait::async_trait;

use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::OrderStatus;
use crate::domain::shared::OrderId;

/// Repository trait for Order persistence.
///
/// Orders are never deleted; the store keeps every order for later lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Save an order (insert or update).
    ///
    /// # Errors
    ///
    /// Returns error if persistence fails.
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Find an order by its ID.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Find all orders with a given status.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError>;

    /// List every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn list(&self) -> Result<Vec<Order>, OrderError>;
}
