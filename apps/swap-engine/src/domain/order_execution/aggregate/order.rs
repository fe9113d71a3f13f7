//! Order Aggregate Root
//!
//! The Order aggregate tracks one swap from submission to settlement. Status
//! only moves forward through the lifecycle or drops to `failed`; venue
//! fields are written once per attempt and cleared only when a new attempt
//! starts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::services::OrderStateMachine;
use crate::domain::order_execution::value_objects::{OrderKind, OrderStatus};
use crate::domain::shared::{OrderId, TxHash};
use crate::domain::venue_routing::{BestQuote, Settlement, Venue};

/// Largest accepted input amount.
///
/// Keeps `amount * price` comfortably inside `Decimal` range.
pub const MAX_AMOUNT_IN: Decimal = dec!(1000000000000000);

/// Command to create a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderCommand {
    /// Order kind.
    pub kind: OrderKind,
    /// Token being sold.
    pub token_in: String,
    /// Token being bought.
    pub token_out: String,
    /// Amount of `token_in` to swap.
    pub amount_in: Decimal,
    /// Slippage tolerance in percent (0-100).
    pub slippage_pct: Decimal,
}

impl CreateOrderCommand {
    /// Validate the command parameters.
    ///
    /// # Errors
    ///
    /// Returns error if a token is blank, the amount is not positive or too
    /// large, or slippage lies outside `[0, 100]`.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.token_in.trim().is_empty() {
            return Err(invalid("token_in", "must not be empty"));
        }
        if self.token_out.trim().is_empty() {
            return Err(invalid("token_out", "must not be empty"));
        }
        if self.amount_in <= Decimal::ZERO {
            return Err(invalid("amount_in", "must be greater than zero"));
        }
        if self.amount_in > MAX_AMOUNT_IN {
            return Err(invalid(
                "amount_in",
                &format!("must not exceed {MAX_AMOUNT_IN}"),
            ));
        }
        if self.slippage_pct < Decimal::ZERO || self.slippage_pct > Decimal::ONE_HUNDRED {
            return Err(invalid("slippage", "must be between 0 and 100"));
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> OrderError {
    OrderError::InvalidParameters {
        field: field.to_string(),
        message: message.to_string(),
    }
}

/// Swap order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    kind: OrderKind,
    token_in: String,
    token_out: String,
    amount_in: Decimal,
    slippage_pct: Decimal,
    status: OrderStatus,
    selected_venue: Option<Venue>,
    venue_quotes: BTreeMap<Venue, Decimal>,
    executed_price: Option<Decimal>,
    amount_out: Option<Decimal>,
    tx_hash: Option<TxHash>,
    error: Option<String>,
    attempts: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a pending order.
    ///
    /// # Errors
    ///
    /// Returns error if the command fails validation.
    pub fn new(command: CreateOrderCommand) -> Result<Self, OrderError> {
        command.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: OrderId::generate(),
            kind: command.kind,
            token_in: command.token_in.trim().to_string(),
            token_out: command.token_out.trim().to_string(),
            amount_in: command.amount_in,
            slippage_pct: command.slippage_pct,
            status: OrderStatus::Pending,
            selected_venue: None,
            venue_quotes: BTreeMap::new(),
            executed_price: None,
            amount_out: None,
            tx_hash: None,
            error: None,
            attempts: 0,
            created_at: now,
            updated_at: now,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Order identifier.
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Order kind.
    #[must_use]
    pub const fn kind(&self) -> OrderKind {
        self.kind
    }

    /// Token being sold.
    #[must_use]
    pub fn token_in(&self) -> &str {
        &self.token_in
    }

    /// Token being bought.
    #[must_use]
    pub fn token_out(&self) -> &str {
        &self.token_out
    }

    /// Input amount.
    #[must_use]
    pub const fn amount_in(&self) -> Decimal {
        self.amount_in
    }

    /// Slippage tolerance in percent.
    #[must_use]
    pub const fn slippage_pct(&self) -> Decimal {
        self.slippage_pct
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Venue chosen during routing.
    #[must_use]
    pub const fn selected_venue(&self) -> Option<Venue> {
        self.selected_venue
    }

    /// Quoted price per venue from the latest routing step.
    #[must_use]
    pub const fn venue_quotes(&self) -> &BTreeMap<Venue, Decimal> {
        &self.venue_quotes
    }

    /// Quoted price from a given venue.
    #[must_use]
    pub fn quoted_price(&self, venue: Venue) -> Option<Decimal> {
        self.venue_quotes.get(&venue).copied()
    }

    /// Price the swap settled at.
    #[must_use]
    pub const fn executed_price(&self) -> Option<Decimal> {
        self.executed_price
    }

    /// Output amount received.
    #[must_use]
    pub const fn amount_out(&self) -> Option<Decimal> {
        self.amount_out
    }

    /// Settlement receipt.
    #[must_use]
    pub const fn tx_hash(&self) -> Option<&TxHash> {
        self.tx_hash.as_ref()
    }

    /// Last error message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of processing attempts started.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification time.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Move to the next status.
    ///
    /// # Errors
    ///
    /// Returns error if `to` is not a valid transition from the current status.
    pub fn advance(&mut self, to: OrderStatus) -> Result<(), OrderError> {
        OrderStateMachine::validate_transition(self.status, to)?;
        self.status = to;
        self.touch();
        Ok(())
    }

    /// Mark the start of the first processing attempt.
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.attempts = attempt;
        self.touch();
    }

    /// Reset a failed order for another attempt, resuming at `routing`.
    ///
    /// # Errors
    ///
    /// Returns error unless the order is currently `failed`.
    pub fn restart_attempt(&mut self, attempt: u32) -> Result<(), OrderError> {
        if self.status != OrderStatus::Failed {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: OrderStatus::Routing,
                reason: "Only failed orders can be retried".to_string(),
            });
        }
        self.selected_venue = None;
        self.venue_quotes.clear();
        self.executed_price = None;
        self.amount_out = None;
        self.tx_hash = None;
        self.error = None;
        self.attempts = attempt;
        self.status = OrderStatus::Routing;
        self.touch();
        Ok(())
    }

    /// Record the routing decision and every venue's quoted price.
    ///
    /// # Errors
    ///
    /// Returns error if routing was already recorded for this attempt.
    pub fn record_routing(&mut self, routing: &BestQuote) -> Result<(), OrderError> {
        if let Some(venue) = self.selected_venue {
            return Err(OrderError::AlreadyRouted {
                order_id: self.id.to_string(),
                venue: venue.to_string(),
            });
        }
        self.selected_venue = Some(routing.best.venue);
        self.venue_quotes = routing.quotes.iter().map(|q| (q.venue, q.price)).collect();
        self.touch();
        Ok(())
    }

    /// Record a successful settlement and move to `confirmed`.
    ///
    /// # Errors
    ///
    /// Returns error if the order is not `submitted`.
    pub fn record_settlement(&mut self, settlement: &Settlement) -> Result<(), OrderError> {
        self.advance(OrderStatus::Confirmed)?;
        self.executed_price = Some(settlement.executed_price);
        self.amount_out = Some(settlement.amount_out);
        self.tx_hash = Some(settlement.tx_hash.clone());
        Ok(())
    }

    /// Move to `failed` with an error message.
    ///
    /// # Errors
    ///
    /// Returns error if the order is already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.advance(OrderStatus::Failed)?;
        self.error = Some(reason.into());
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::venue_routing::Quote;

    fn command() -> CreateOrderCommand {
        CreateOrderCommand {
            kind: OrderKind::Market,
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: dec!(10),
            slippage_pct: dec!(1),
        }
    }

    fn routing() -> BestQuote {
        let quote = |venue, price| Quote {
            venue,
            price,
            fee: dec!(0.003),
            estimated_output: price * dec!(10),
            generated_at: Utc::now(),
        };
        let best = quote(Venue::Raydium, dec!(2));
        BestQuote {
            quotes: vec![quote(Venue::Meteora, dec!(1.9)), best.clone()],
            best,
            spread_pct: dec!(5.26),
        }
    }

    fn settlement() -> Settlement {
        Settlement {
            venue: Venue::Raydium,
            executed_price: dec!(2.01),
            amount_out: dec!(20.1),
            tx_hash: TxHash::from_bytes(&[7; 32]),
            settled_at: Utc::now(),
        }
    }

    fn routed_order() -> Order {
        let mut order = Order::new(command()).unwrap();
        order.begin_attempt(1);
        order.advance(OrderStatus::Routing).unwrap();
        order.record_routing(&routing()).unwrap();
        order
    }

    #[test]
    fn new_order_is_pending() {
        let order = Order::new(command()).unwrap();
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.attempts(), 0);
        assert!(order.selected_venue().is_none());
        assert!(uuid::Uuid::parse_str(order.id().as_str()).is_ok());
    }

    #[test]
    fn new_order_rejects_invalid_parameters() {
        let mut cmd = command();
        cmd.amount_in = dec!(0);
        assert!(matches!(
            Order::new(cmd),
            Err(OrderError::InvalidParameters { field, .. }) if field == "amount_in"
        ));

        let mut cmd = command();
        cmd.token_out = "  ".to_string();
        assert!(Order::new(cmd).is_err());

        let mut cmd = command();
        cmd.slippage_pct = dec!(100.5);
        assert!(Order::new(cmd).is_err());

        let mut cmd = command();
        cmd.amount_in = MAX_AMOUNT_IN + dec!(1);
        assert!(Order::new(cmd).is_err());
    }

    #[test]
    fn max_amount_is_one_quadrillion() {
        assert_eq!(MAX_AMOUNT_IN, dec!(1000000000000000));
    }

    #[test]
    fn full_lifecycle() {
        let mut order = routed_order();
        assert_eq!(order.selected_venue(), Some(Venue::Raydium));
        assert_eq!(order.quoted_price(Venue::Meteora), Some(dec!(1.9)));

        order.advance(OrderStatus::Building).unwrap();
        order.advance(OrderStatus::Submitted).unwrap();
        order.record_settlement(&settlement()).unwrap();

        assert_eq!(order.status(), OrderStatus::Confirmed);
        assert_eq!(order.amount_out(), Some(dec!(20.1)));
        assert!(order.tx_hash().unwrap().is_well_formed());
    }

    #[test]
    fn cannot_skip_states() {
        let mut order = Order::new(command()).unwrap();
        assert!(order.advance(OrderStatus::Submitted).is_err());
        assert_eq!(order.status(), OrderStatus::Pending);
    }

    #[test]
    fn settlement_requires_submitted() {
        let mut order = routed_order();
        assert!(order.record_settlement(&settlement()).is_err());
        assert!(order.executed_price().is_none());
    }

    #[test]
    fn routing_is_recorded_once() {
        let mut order = routed_order();
        assert!(matches!(
            order.record_routing(&routing()),
            Err(OrderError::AlreadyRouted { .. })
        ));
    }

    #[test]
    fn fail_records_error() {
        let mut order = routed_order();
        order.fail("venue timeout").unwrap();
        assert_eq!(order.status(), OrderStatus::Failed);
        assert_eq!(order.error(), Some("venue timeout"));
        assert!(order.fail("again").is_err());
    }

    #[test]
    fn restart_clears_venue_fields() {
        let mut order = routed_order();
        order.fail("venue timeout").unwrap();
        order.restart_attempt(2).unwrap();

        assert_eq!(order.status(), OrderStatus::Routing);
        assert_eq!(order.attempts(), 2);
        assert!(order.selected_venue().is_none());
        assert!(order.venue_quotes().is_empty());
        assert!(order.error().is_none());
        order.record_routing(&routing()).unwrap();
    }

    #[test]
    fn restart_requires_failed() {
        let mut order = routed_order();
        assert!(order.restart_attempt(2).is_err());
    }
}
