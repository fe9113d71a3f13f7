//! Settlement outcome.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Venue;
use crate::domain::shared::TxHash;

/// Details of a successful settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// Venue that settled the swap.
    pub venue: Venue,
    /// Price after slippage.
    pub executed_price: Decimal,
    /// `amount_in * executed_price`.
    pub amount_out: Decimal,
    /// Settlement receipt.
    pub tx_hash: TxHash,
    /// Settlement time.
    pub settled_at: DateTime<Utc>,
}

/// Result of a settlement attempt. Never an error: failures are values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Swap settled.
    Settled(Settlement),
    /// Venue rejected or failed the swap.
    Failed {
        /// Venue that failed.
        venue: Venue,
        /// Failure description.
        reason: String,
    },
}

impl ExecutionResult {
    /// Whether the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    /// Venue the attempt was made on.
    #[must_use]
    pub const fn venue(&self) -> Venue {
        match self {
            Self::Settled(s) => s.venue,
            Self::Failed { venue, .. } => *venue,
        }
    }
}
