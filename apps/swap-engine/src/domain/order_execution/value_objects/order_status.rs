//! Order status in the execution lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status of a swap order.
///
/// Orders advance strictly forward through
/// `Pending -> Routing -> Building -> Submitted -> Confirmed`
/// and may drop to `Failed` from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted, waiting for processing.
    Pending,
    /// Comparing venue quotes.
    Routing,
    /// Constructing the settlement transaction.
    Building,
    /// Transaction sent to the selected venue.
    Submitted,
    /// Settlement confirmed.
    Confirmed,
    /// Processing failed.
    Failed,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Routing,
        Self::Building,
        Self::Submitted,
        Self::Confirmed,
        Self::Failed,
    ];

    /// Returns true if the order is in a terminal state.
    ///
    /// `Failed` is terminal for a single attempt; the queue may still
    /// restart the order for another attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// The next status in the forward sequence, if any.
    #[must_use]
    pub const fn successor(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Routing),
            Self::Routing => Some(Self::Building),
            Self::Building => Some(Self::Submitted),
            Self::Submitted => Some(Self::Confirmed),
            Self::Confirmed | Self::Failed => None,
        }
    }

    /// Position in the forward sequence (`Failed` sorts last).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Routing => 1,
            Self::Building => 2,
            Self::Submitted => 3,
            Self::Confirmed => 4,
            Self::Failed => 5,
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Routing => "routing",
            Self::Building => "building",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Routing.is_terminal());
        assert!(!OrderStatus::Building.is_terminal());
        assert!(!OrderStatus::Submitted.is_terminal());
        assert!(OrderStatus::Confirmed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }

    #[test]
    fn successor_chain_ends_at_confirmed() {
        let mut status = OrderStatus::Pending;
        let mut visited = vec![status];
        while let Some(next) = status.successor() {
            visited.push(next);
            status = next;
        }
        assert_eq!(
            visited,
            vec![
                OrderStatus::Pending,
                OrderStatus::Routing,
                OrderStatus::Building,
                OrderStatus::Submitted,
                OrderStatus::Confirmed,
            ]
        );
        assert!(OrderStatus::Failed.successor().is_none());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(OrderStatus::parse("ROUTING"), Some(OrderStatus::Routing));
        assert_eq!(OrderStatus::parse("failed"), Some(OrderStatus::Failed));
        assert_eq!(OrderStatus::parse("filled"), None);
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&OrderStatus::Submitted).unwrap();
        assert_eq!(json, "\"submitted\"");

        let parsed: OrderStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(parsed, OrderStatus::Confirmed);
    }

    #[test]
    fn display_matches_wire_name() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
