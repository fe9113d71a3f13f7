//! Order execution errors.

use thiserror::Error;

use super::value_objects::OrderStatus;

/// Errors that can occur in order execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// Invalid state transition attempted.
    #[error("Invalid order state transition: {from} -> {to}: {reason}")]
    InvalidStateTransition {
        /// Current order status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid order parameters.
    #[error("Invalid order parameter '{field}': {message}")]
    InvalidParameters {
        /// Field with invalid value.
        field: String,
        /// Error message.
        message: String,
    },

    /// Routing results were already recorded for the current attempt.
    #[error("Order {order_id} already routed to {venue}")]
    AlreadyRouted {
        /// Order ID.
        order_id: String,
        /// Venue selected earlier.
        venue: String,
    },

    /// Order not found.
    #[error("Order not found: {order_id}")]
    NotFound {
        /// Order ID.
        order_id: String,
    },

    /// Order store failure.
    #[error("Order store error: {0}")]
    Persistence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_error_invalid_state_transition_display() {
        let err = OrderError::InvalidStateTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
            reason: "skipped".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pending"));
        assert!(msg.contains("confirmed"));
    }

    #[test]
    fn order_error_not_found_display() {
        let err = OrderError::NotFound {
            order_id: "ord-123".to_string(),
        };
        assert!(err.to_string().contains("ord-123"));
    }

    #[test]
    fn order_error_is_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(OrderError::Persistence("disk full".to_string()));
        assert!(err.to_string().contains("disk full"));
    }
}
