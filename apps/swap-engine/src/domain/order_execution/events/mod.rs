//! Order status events.
//!
//! One event is emitted per status transition and fanned out to the
//! order's subscribers. Events are transient and never replayed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value_objects::OrderStatus;
use crate::domain::shared::{OrderId, TxHash};
use crate::domain::venue_routing::{BestQuote, Settlement, Venue};

/// A status transition of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Order the event belongs to.
    pub order_id: OrderId,
    /// Status the order moved to.
    pub status: OrderStatus,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured details for the transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StatusPayload>,
    /// When the transition happened.
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(order_id: OrderId, status: OrderStatus) -> Self {
        Self {
            order_id,
            status,
            message: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: StatusPayload) -> Self {
        self.data = Some(data);
        self
    }

    /// Whether this event ends the current attempt.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Structured event details. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    /// Venue chosen during routing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_dex: Option<Venue>,
    /// Raydium's quoted price.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub raydium_quote: Option<Decimal>,
    /// Meteora's quoted price.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub meteora_quote: Option<Decimal>,
    /// Spread between best and worst quote in percent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price_difference_pct: Option<Decimal>,
    /// Settled price.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub executed_price: Option<Decimal>,
    /// Settled output amount.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount_out: Option<Decimal>,
    /// Settlement receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempt number the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    /// Whether the queue will retry after this failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub will_retry: Option<bool>,
}

impl StatusPayload {
    /// Payload for the routing decision.
    #[must_use]
    pub fn routing(routing: &BestQuote) -> Self {
        Self {
            selected_dex: Some(routing.best.venue),
            raydium_quote: routing.quote_for(Venue::Raydium).map(|q| q.price),
            meteora_quote: routing.quote_for(Venue::Meteora).map(|q| q.price),
            price_difference_pct: Some(routing.spread_pct),
            ..Self::default()
        }
    }

    /// Payload for the selected venue only.
    #[must_use]
    pub fn venue(venue: Venue) -> Self {
        Self {
            selected_dex: Some(venue),
            ..Self::default()
        }
    }

    /// Payload for a confirmed settlement.
    #[must_use]
    pub fn settled(settlement: &Settlement) -> Self {
        Self {
            selected_dex: Some(settlement.venue),
            executed_price: Some(settlement.executed_price),
            amount_out: Some(settlement.amount_out),
            tx_hash: Some(settlement.tx_hash.clone()),
            ..Self::default()
        }
    }

    /// Payload for a failed attempt.
    #[must_use]
    pub fn failure(error: impl Into<String>, attempt: u32, will_retry: bool) -> Self {
        Self {
            error: Some(error.into()),
            attempt: Some(attempt),
            will_retry: Some(will_retry),
            ..Self::default()
        }
    }
}
