//! Order State Machine Service
//!
//! Validates swap order status transitions.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
///
/// An order moves one step forward at a time
/// (`pending -> routing -> building -> submitted -> confirmed`) or drops to
/// `failed` from any non-terminal status.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        if from.is_terminal() {
            return false;
        }
        to == OrderStatus::Failed || from.successor() == Some(to)
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Confirmed => format!("Order is already confirmed, cannot move to {to}"),
            OrderStatus::Failed => format!("Order has failed, cannot move to {to}"),
            _ if to.rank() < from.rank() => format!("Order cannot move backwards from {from}"),
            _ => format!("Order cannot skip from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        if from.is_terminal() {
            return vec![];
        }
        from.successor()
            .into_iter()
            .chain(std::iter::once(OrderStatus::Failed))
            .collect()
    }
}
