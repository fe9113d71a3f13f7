//! Order kind (execution style).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of swap order.
///
/// Only `Market` orders are executed by the pipeline today; `Limit` and
/// `Sniper` are accepted and routed exactly like market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Execute immediately at the best available price.
    #[default]
    Market,
    /// Execute at a target price or better.
    Limit,
    /// Execute on token launch or migration.
    Sniper,
}

impl OrderKind {
    /// Wire name of the order kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Sniper => "sniper",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
