//! Venue Router Service
//!
//! Quotes every configured venue concurrently, picks the one with the
//! highest net output and simulates settlement on the chosen venue.
//!
//! Randomness and latency come from the injected [`RandomSource`] and
//! [`Delay`] ports, so tests can pin prices and skip the waits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{Cancelled, Delay, RandomSource};
use crate::domain::order_execution::Order;
use crate::domain::shared::TxHash;
use crate::domain::venue_routing::services::{BPS_SCALE, MIN_ADJUSTMENT_BPS};
use crate::domain::venue_routing::{
    BestQuote, ExecutionResult, PricingService, Quote, Settlement, Venue,
};
use crate::application::metrics;

/// Default probability that a settlement fails.
pub const DEFAULT_FAILURE_RATE: f64 = 0.05;

// =============================================================================
// Configuration
// =============================================================================

/// Simulation profile of one venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueProfile {
    /// Venue identifier.
    pub venue: Venue,
    /// Fee rate as a fraction (0.002 = 0.20%).
    pub fee: Decimal,
    /// Lowest price variance in basis points (must stay above -10000).
    pub variance_min_bps: i64,
    /// Highest price variance in basis points.
    pub variance_max_bps: i64,
    /// Quote latency lower bound.
    pub quote_latency_min: Duration,
    /// Quote latency upper bound.
    pub quote_latency_max: Duration,
    /// Settlement latency lower bound.
    pub settle_latency_min: Duration,
    /// Settlement latency upper bound.
    pub settle_latency_max: Duration,
}

impl VenueProfile {
    /// Meteora: 0.20% fee, -3%..+2% variance.
    #[must_use]
    pub const fn meteora() -> Self {
        Self {
            venue: Venue::Meteora,
            fee: dec!(0.002),
            variance_min_bps: -300,
            variance_max_bps: 200,
            quote_latency_min: Duration::from_millis(150),
            quote_latency_max: Duration::from_millis(300),
            settle_latency_min: Duration::from_millis(2000),
            settle_latency_max: Duration::from_millis(3000),
        }
    }

    /// Raydium: 0.30% fee, -2%..+2% variance.
    #[must_use]
    pub const fn raydium() -> Self {
        Self {
            venue: Venue::Raydium,
            fee: dec!(0.003),
            variance_min_bps: -200,
            variance_max_bps: 200,
            quote_latency_min: Duration::from_millis(150),
            quote_latency_max: Duration::from_millis(300),
            settle_latency_min: Duration::from_millis(2000),
            settle_latency_max: Duration::from_millis(3000),
        }
    }
}

/// Router configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct VenueRouterConfig {
    /// Venues in tie-break precedence order.
    pub venues: Vec<VenueProfile>,
    /// Probability that a settlement fails, in `[0, 1]`.
    pub failure_rate: f64,
}

impl Default for VenueRouterConfig {
    fn default() -> Self {
        Self {
            venues: vec![VenueProfile::meteora(), VenueProfile::raydium()],
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors produced while quoting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// No profile for the requested venue.
    #[error("venue {0} is not configured")]
    UnknownVenue(Venue),

    /// Router has no venues.
    #[error("no venues configured")]
    NoVenues,

    /// Quote amount not positive.
    #[error("quote amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Shutdown interrupted the quote.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

// =============================================================================
// Router
// =============================================================================

/// Selects venues and simulates settlement.
pub struct VenueRouter {
    config: VenueRouterConfig,
    random: Arc<dyn RandomSource>,
    delay: Arc<dyn Delay>,
}

impl VenueRouter {
    /// Create a router.
    pub fn new(
        config: VenueRouterConfig,
        random: Arc<dyn RandomSource>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            config,
            random,
            delay,
        }
    }

    /// Router configuration.
    #[must_use]
    pub const fn config(&self) -> &VenueRouterConfig {
        &self.config
    }

    fn profile(&self, venue: Venue) -> Result<&VenueProfile, RoutingError> {
        self.config
            .venues
            .iter()
            .find(|p| p.venue == venue)
            .ok_or(RoutingError::UnknownVenue(venue))
    }

    /// Quote a swap on one venue.
    ///
    /// # Errors
    ///
    /// Returns error if the venue is unknown, the amount is not positive, or
    /// the quote latency was cancelled.
    pub async fn quote(
        &self,
        venue: Venue,
        token_in: &str,
        token_out: &str,
        amount: Decimal,
        cancel: &CancellationToken,
    ) -> Result<Quote, RoutingError> {
        if amount <= Decimal::ZERO {
            return Err(RoutingError::InvalidAmount(amount));
        }
        let profile = self.profile(venue)?;
        let started = Instant::now();

        let latency = self
            .random
            .next_duration(profile.quote_latency_min, profile.quote_latency_max);
        self.delay.sleep(latency, cancel).await?;

        let variance = self
            .random
            .next_in_range(profile.variance_min_bps, profile.variance_max_bps);
        let price =
            PricingService::adjust_by_bps(PricingService::base_price(token_in, token_out), variance);
        let estimated_output = PricingService::net_output(amount, price, profile.fee);

        metrics::record_quote_latency(venue, started.elapsed());
        tracing::debug!(
            venue = %venue,
            %price,
            %estimated_output,
            variance_bps = variance,
            "Quote generated"
        );

        Ok(Quote {
            venue,
            price,
            fee: profile.fee,
            estimated_output,
            generated_at: Utc::now(),
        })
    }

    /// Quote every configured venue concurrently and pick the best.
    ///
    /// # Errors
    ///
    /// Returns error if no venue is configured or any quote fails.
    pub async fn best_quote(
        &self,
        token_in: &str,
        token_out: &str,
        amount: Decimal,
        cancel: &CancellationToken,
    ) -> Result<BestQuote, RoutingError> {
        let quotes = try_join_all(
            self.config
                .venues
                .iter()
                .map(|p| self.quote(p.venue, token_in, token_out, amount, cancel)),
        )
        .await?;

        let best = PricingService::select_best(&quotes)
            .cloned()
            .ok_or(RoutingError::NoVenues)?;
        let worst = quotes
            .iter()
            .map(|q| q.estimated_output)
            .min()
            .unwrap_or(best.estimated_output);
        let spread_pct = PricingService::spread_pct(best.estimated_output, worst);

        tracing::info!(
            selected = %best.venue,
            output = %best.estimated_output,
            spread_pct = %spread_pct,
            "Venue selected"
        );

        Ok(BestQuote {
            best,
            quotes,
            spread_pct,
        })
    }

    /// Simulate settlement of `order` on `venue`.
    ///
    /// Never fails with an error: a venue failure or cancellation is reported
    /// as [`ExecutionResult::Failed`].
    pub async fn execute(
        &self,
        venue: Venue,
        order: &Order,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let failed = |reason: String| ExecutionResult::Failed { venue, reason };

        let profile = match self.profile(venue) {
            Ok(p) => p,
            Err(e) => return failed(e.to_string()),
        };
        let Some(quoted) = order.quoted_price(venue) else {
            return failed(format!("no quote recorded for {venue}"));
        };

        let latency = self
            .random
            .next_duration(profile.settle_latency_min, profile.settle_latency_max);
        if self.delay.sleep(latency, cancel).await.is_err() {
            return failed("settlement cancelled".to_string());
        }

        if self.random.chance(self.config.failure_rate) {
            metrics::record_settlement_failure(venue);
            tracing::warn!(order_id = %order.id(), venue = %venue, "Simulated settlement failure");
            return failed(format!("{venue} settlement failed: transaction dropped"));
        }

        let executed_price = PricingService::adjust_by_bps(quoted, self.slippage_draw(order));
        let amount_out = order.amount_in() * executed_price;

        let mut receipt = [0u8; 32];
        self.random.fill_bytes(&mut receipt);

        ExecutionResult::Settled(Settlement {
            venue,
            executed_price,
            amount_out,
            tx_hash: TxHash::from_bytes(&receipt),
            settled_at: Utc::now(),
        })
    }

    /// Symmetric slippage draw in basis points, bounded by the order's tolerance.
    fn slippage_draw(&self, order: &Order) -> i64 {
        let tolerance_bps: i64 = (order.slippage_pct() * Decimal::ONE_HUNDRED)
            .trunc()
            .try_into()
            .unwrap_or(BPS_SCALE);
        self.random
            .next_in_range(-tolerance_bps, tolerance_bps)
            .max(MIN_ADJUSTMENT_BPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_execution::{CreateOrderCommand, OrderKind, OrderStatus};
    use crate::infrastructure::simulation::{NoDelay, SequenceRandomSource, ThreadRandomSource};

    fn router(values: Vec<f64>, failure_rate: f64) -> VenueRouter {
        VenueRouter::new(
            VenueRouterConfig {
                failure_rate,
                ..VenueRouterConfig::default()
            },
            Arc::new(SequenceRandomSource::new(values)),
            Arc::new(NoDelay),
        )
    }

    fn routed_order(best: &BestQuote, slippage: Decimal) -> Order {
        let mut order = Order::new(CreateOrderCommand {
            kind: OrderKind::Market,
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: dec!(10),
            slippage_pct: slippage,
        })
        .unwrap();
        order.begin_attempt(1);
        order.advance(OrderStatus::Routing).unwrap();
        order.record_routing(best).unwrap();
        order
    }

    #[tokio::test]
    async fn quote_applies_fee_to_output() {
        let router = router(vec![0.5], 0.0);
        let cancel = CancellationToken::new();
        let quote = router
            .quote(Venue::Raydium, "SOL", "USDC", dec!(10), &cancel)
            .await
            .unwrap();

        assert_eq!(quote.fee, dec!(0.003));
        assert_eq!(
            quote.estimated_output,
            dec!(10) * quote.price * (Decimal::ONE - dec!(0.003))
        );
        assert!(quote.price > Decimal::ZERO);
    }

    #[tokio::test]
    async fn quote_rejects_non_positive_amount() {
        let router = router(vec![0.5], 0.0);
        let err = router
            .quote(Venue::Meteora, "SOL", "USDC", dec!(0), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, RoutingError::InvalidAmount(dec!(0)));
    }

    #[tokio::test]
    async fn best_quote_picks_max_output() {
        let router = VenueRouter::new(
            VenueRouterConfig::default(),
            Arc::new(ThreadRandomSource),
            Arc::new(NoDelay),
        );
        let cancel = CancellationToken::new();
        for _ in 0..20 {
            let result = router
                .best_quote("SOL", "USDC", dec!(5), &cancel)
                .await
                .unwrap();
            let max = result
                .quotes
                .iter()
                .map(|q| q.estimated_output)
                .max()
                .unwrap();
            assert_eq!(result.best.estimated_output, max);
            assert_eq!(result.quotes.len(), 2);
            assert!(result.spread_pct >= Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn equal_variance_prefers_lower_fee_venue() {
        // Same price on both venues, so the lower fee wins.
        let router = VenueRouter::new(
            VenueRouterConfig {
                venues: vec![
                    VenueProfile {
                        variance_min_bps: 0,
                        variance_max_bps: 0,
                        ..VenueProfile::meteora()
                    },
                    VenueProfile {
                        variance_min_bps: 0,
                        variance_max_bps: 0,
                        ..VenueProfile::raydium()
                    },
                ],
                failure_rate: 0.0,
            },
            Arc::new(SequenceRandomSource::new(vec![0.3])),
            Arc::new(NoDelay),
        );
        let result = router
            .best_quote("SOL", "USDC", dec!(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.best.venue, Venue::Meteora);
    }

    #[tokio::test]
    async fn tie_goes_to_first_configured_venue() {
        let flat = |profile: VenueProfile| VenueProfile {
            fee: dec!(0.003),
            variance_min_bps: 0,
            variance_max_bps: 0,
            ..profile
        };
        let router = VenueRouter::new(
            VenueRouterConfig {
                venues: vec![flat(VenueProfile::raydium()), flat(VenueProfile::meteora())],
                failure_rate: 0.0,
            },
            Arc::new(SequenceRandomSource::new(vec![0.5])),
            Arc::new(NoDelay),
        );
        let result = router
            .best_quote("SOL", "USDC", dec!(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.quotes[0].estimated_output, result.quotes[1].estimated_output);
        assert_eq!(result.best.venue, Venue::Raydium);
    }

    #[tokio::test]
    async fn execute_settles_within_slippage() {
        let router = router(vec![0.5, 0.9, 0.1], 0.0);
        let cancel = CancellationToken::new();
        let best = router
            .best_quote("SOL", "USDC", dec!(10), &cancel)
            .await
            .unwrap();
        let order = routed_order(&best, dec!(1));
        let quoted = order.quoted_price(best.best.venue).unwrap();

        match router.execute(best.best.venue, &order, &cancel).await {
            ExecutionResult::Settled(settlement) => {
                let deviation = ((settlement.executed_price - quoted) / quoted).abs();
                assert!(deviation <= dec!(0.01));
                assert_eq!(settlement.amount_out, dec!(10) * settlement.executed_price);
                assert!(settlement.tx_hash.is_well_formed());
            }
            ExecutionResult::Failed { reason, .. } => panic!("unexpected failure: {reason}"),
        }
    }

    #[tokio::test]
    async fn execute_reports_failure_as_value() {
        let router = router(vec![0.5], 1.0);
        let cancel = CancellationToken::new();
        let best = router
            .best_quote("SOL", "USDC", dec!(10), &cancel)
            .await
            .unwrap();
        let order = routed_order(&best, dec!(1));

        let result = router.execute(best.best.venue, &order, &cancel).await;
        assert!(!result.is_success());
        assert_eq!(result.venue(), best.best.venue);
    }

    #[tokio::test]
    async fn execute_without_quote_fails() {
        let router = router(vec![0.5], 0.0);
        let order = Order::new(CreateOrderCommand {
            kind: OrderKind::Market,
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: dec!(1),
            slippage_pct: dec!(1),
        })
        .unwrap();
        let result = router
            .execute(Venue::Raydium, &order, &CancellationToken::new())
            .await;
        assert!(matches!(result, ExecutionResult::Failed { .. }));
    }

    #[tokio::test]
    async fn receipts_are_unique() {
        let router = router(vec![0.5, 0.2, 0.8], 0.0);
        let cancel = CancellationToken::new();
        let best = router
            .best_quote("SOL", "USDC", dec!(10), &cancel)
            .await
            .unwrap();
        let order = routed_order(&best, dec!(1));

        let mut hashes = Vec::new();
        for _ in 0..3 {
            if let ExecutionResult::Settled(s) = router.execute(best.best.venue, &order, &cancel).await
            {
                hashes.push(s.tx_hash);
            }
        }
        assert_eq!(hashes.len(), 3);
        assert_ne!(hashes[0], hashes[1]);
        assert_ne!(hashes[1], hashes[2]);
    }

    #[tokio::test]
    async fn cancelled_quote_errors() {
        let router = VenueRouter::new(
            VenueRouterConfig::default(),
            Arc::new(ThreadRandomSource),
            Arc::new(crate::infrastructure::simulation::TokioDelay),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = router
            .quote(Venue::Raydium, "SOL", "USDC", dec!(1), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, RoutingError::Cancelled(Cancelled));
    }
}
