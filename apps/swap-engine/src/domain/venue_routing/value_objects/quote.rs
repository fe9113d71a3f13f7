//! Venue quotes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Venue;

/// A venue's price, fee and output estimate for one swap.
///
/// Quotes are ephemeral: they are valid only for the routing step that
/// requested them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Quoting venue.
    pub venue: Venue,
    /// Unit price (output tokens per input token).
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Venue fee rate as a fraction (0.003 = 0.30%).
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    /// Output after fee: `amount * price * (1 - fee)`.
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_output: Decimal,
    /// When the quote was produced.
    pub generated_at: DateTime<Utc>,
}

/// Outcome of comparing quotes from every configured venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestQuote {
    /// Quote with the highest estimated output.
    pub best: Quote,
    /// Every venue's quote, in configured precedence order.
    pub quotes: Vec<Quote>,
    /// Difference between best and worst output, in percent of the worst.
    pub spread_pct: Decimal,
}

impl BestQuote {
    /// Quote returned by a given venue.
    #[must_use]
    pub fn quote_for(&self, venue: Venue) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.venue == venue)
    }
}
