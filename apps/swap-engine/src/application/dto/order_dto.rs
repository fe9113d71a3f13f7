//! Order DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order_execution::aggregate::{CreateOrderCommand, MAX_AMOUNT_IN, Order};
use crate::domain::order_execution::value_objects::{OrderKind, OrderStatus};
use crate::domain::venue_routing::Venue;

/// Slippage tolerance applied when a request omits it, in percent.
pub const DEFAULT_SLIPPAGE_PCT: Decimal = Decimal::ONE;

/// Request validation failure. Rejected requests never reach the queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required field absent.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Unknown order type.
    #[error("type must be one of market, limit, sniper (got '{0}')")]
    InvalidOrderType(String),

    /// Token symbol blank.
    #[error("{0} must not be empty")]
    EmptyToken(&'static str),

    /// Amount zero or negative.
    #[error("amountIn must be greater than 0")]
    NonPositiveAmount,

    /// Amount above the accepted maximum.
    #[error("amountIn must not exceed {0}")]
    AmountTooLarge(Decimal),

    /// Slippage outside `[0, 100]`.
    #[error("slippage must be between 0 and 100")]
    SlippageOutOfRange,

    /// Body could not be parsed.
    #[error("invalid request body: {0}")]
    Malformed(String),
}

/// Incoming swap order request.
///
/// Every field is optional at the wire level so that missing fields surface
/// as [`ValidationError`]s instead of parse failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Order type: `market`, `limit` or `sniper`.
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
    /// Token being sold.
    #[serde(default)]
    pub token_in: Option<String>,
    /// Token being bought.
    #[serde(default)]
    pub token_out: Option<String>,
    /// Amount of `token_in`.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount_in: Option<Decimal>,
    /// Slippage tolerance in percent; defaults to 1.
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub slippage: Option<Decimal>,
}

impl CreateOrderRequest {
    /// Validate the request and convert it into a domain command.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(self) -> Result<CreateOrderCommand, ValidationError> {
        let kind = match self.order_type.as_deref() {
            None => return Err(ValidationError::MissingField("type")),
            Some("market") => OrderKind::Market,
            Some("limit") => OrderKind::Limit,
            Some("sniper") => OrderKind::Sniper,
            Some(other) => return Err(ValidationError::InvalidOrderType(other.to_string())),
        };

        let token_in = required_token(self.token_in, "tokenIn")?;
        let token_out = required_token(self.token_out, "tokenOut")?;

        let amount_in = self
            .amount_in
            .ok_or(ValidationError::MissingField("amountIn"))?;
        if amount_in <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if amount_in > MAX_AMOUNT_IN {
            return Err(ValidationError::AmountTooLarge(MAX_AMOUNT_IN));
        }

        let slippage_pct = self.slippage.unwrap_or(DEFAULT_SLIPPAGE_PCT);
        if slippage_pct < Decimal::ZERO || slippage_pct > Decimal::ONE_HUNDRED {
            return Err(ValidationError::SlippageOutOfRange);
        }

        Ok(CreateOrderCommand {
            kind,
            token_in,
            token_out,
            amount_in,
            slippage_pct,
        })
    }
}

fn required_token(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyToken(field));
    }
    Ok(trimmed.to_string())
}

/// Response for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    /// Identifier of the new order.
    pub order_id: String,
    /// Always `pending` at submission time.
    pub status: OrderStatus,
}

/// Snapshot of an order for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    /// Order ID.
    pub order_id: String,
    /// Order kind.
    #[serde(rename = "type")]
    pub order_type: OrderKind,
    /// Token sold.
    pub token_in: String,
    /// Token bought.
    pub token_out: String,
    /// Input amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_in: Decimal,
    /// Slippage tolerance in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub slippage: Decimal,
    /// Status.
    pub status: OrderStatus,
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
    /// Settled price.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub executed_price: Option<Decimal>,
    /// Settled output.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount_out: Option<Decimal>,
    /// Settlement receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    /// Last error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts started so far.
    pub retry_count: u32,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Updated at.
    pub updated_at: DateTime<Utc>,
}

impl OrderDto {
    /// Create from domain Order.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().to_string(),
            order_type: order.kind(),
            token_in: order.token_in().to_string(),
            token_out: order.token_out().to_string(),
            amount_in: order.amount_in(),
            slippage: order.slippage_pct(),
            status: order.status(),
            selected_dex: order.selected_venue(),
            raydium_quote: order.quoted_price(Venue::Raydium),
            meteora_quote: order.quoted_price(Venue::Meteora),
            executed_price: order.executed_price(),
            amount_out: order.amount_out(),
            tx_hash: order.tx_hash().map(ToString::to_string),
            error: order.error().map(ToString::to_string),
            retry_count: order.attempts(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}
