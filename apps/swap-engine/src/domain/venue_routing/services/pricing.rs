//! Quote Pricing
//!
//! Pure price arithmetic for simulated venues: deterministic base prices,
//! basis-point adjustments, fee-adjusted output and best-quote selection.

use rust_decimal::Decimal;

use crate::domain::venue_routing::value_objects::Quote;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Number of distinct base price steps (5 decimal places over a 100 wide range).
const PRICE_STEPS: u64 = 10_000_000;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

/// Lowest adjustment that still leaves a strictly positive price.
pub const MIN_ADJUSTMENT_BPS: i64 = -(BPS_SCALE - 1);

/// Stateless pricing functions shared by every venue.
pub struct PricingService;

impl PricingService {
    /// FNV-1a hash of a byte string.
    #[must_use]
    pub fn fnv1a(bytes: &[u8]) -> u64 {
        bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
        })
    }

    /// Deterministic base price for a token pair, in `[1, 101)`.
    ///
    /// The same pair always yields the same price; the pair is ordered, so
    /// `A/B` and `B/A` generally differ.
    #[must_use]
    pub fn base_price(token_in: &str, token_out: &str) -> Decimal {
        let hash = Self::fnv1a(format!("{token_in}/{token_out}").as_bytes());
        let steps = i64::try_from(hash % PRICE_STEPS).unwrap_or_default();
        Decimal::new(steps, 5) + Decimal::ONE
    }

    /// Scale a price by `(10000 + bps) / 10000`.
    ///
    /// Adjustments below [`MIN_ADJUSTMENT_BPS`] are clamped so the result
    /// stays positive for a positive input.
    #[must_use]
    pub fn adjust_by_bps(price: Decimal, bps: i64) -> Decimal {
        let bps = bps.max(MIN_ADJUSTMENT_BPS);
        price * Decimal::from(BPS_SCALE + bps) / Decimal::from(BPS_SCALE)
    }

    /// Output after fee: `amount * price * (1 - fee)`.
    #[must_use]
    pub fn net_output(amount: Decimal, price: Decimal, fee: Decimal) -> Decimal {
        amount * price * (Decimal::ONE - fee)
    }

    /// Percentage difference between the best and worst output.
    #[must_use]
    pub fn spread_pct(best: Decimal, worst: Decimal) -> Decimal {
        if worst <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((best - worst) / worst * Decimal::ONE_HUNDRED).round_dp(4)
    }

    /// Quote with the strictly highest estimated output.
    ///
    /// On equal output the earlier quote wins, so slice order is the
    /// tie-break precedence.
    #[must_use]
    pub fn select_best(quotes: &[Quote]) -> Option<&Quote> {
        quotes.iter().fold(None, |best: Option<&Quote>, quote| match best {
            Some(current) if quote.estimated_output <= current.estimated_output => Some(current),
            _ => Some(quote),
        })
    }
}
