//! Pipeline Metrics
//!
//! Metric names and recording helpers used by the application services.
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed by the infrastructure layer.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

use crate::application::services::QueueStats;
use crate::domain::order_execution::OrderStatus;
use crate::domain::venue_routing::Venue;

// =============================================================================
// Metric Names
// =============================================================================

/// Orders accepted by the API.
pub const ORDERS_SUBMITTED: &str = "swap_engine_orders_submitted_total";
/// Orders settled successfully.
pub const ORDERS_CONFIRMED: &str = "swap_engine_orders_confirmed_total";
/// Orders that failed for good.
pub const ORDERS_FAILED: &str = "swap_engine_orders_failed_total";
/// Attempts scheduled for retry.
pub const ORDER_RETRIES: &str = "swap_engine_order_retries_total";
/// Published status events, labelled by status.
pub const STATUS_EVENTS: &str = "swap_engine_status_events_total";
/// Queue jobs, labelled by state.
pub const QUEUE_JOBS: &str = "swap_engine_queue_jobs";
/// Quote latency, labelled by venue.
pub const QUOTE_LATENCY: &str = "swap_engine_quote_latency_seconds";
/// Settlement failures, labelled by venue.
pub const SETTLEMENT_FAILURES: &str = "swap_engine_settlement_failures_total";
/// Execution attempt duration, labelled by outcome.
pub const EXECUTION_DURATION: &str = "swap_engine_execution_duration_seconds";

// =============================================================================
// Recording
// =============================================================================

/// Record an accepted submission.
pub fn record_order_submitted() {
    counter!(ORDERS_SUBMITTED).increment(1);
}

/// Record an order reaching `confirmed`.
pub fn record_order_confirmed() {
    counter!(ORDERS_CONFIRMED).increment(1);
}

/// Record an order failing for good.
pub fn record_order_failed() {
    counter!(ORDERS_FAILED).increment(1);
}

/// Record a retry being scheduled.
pub fn record_retry() {
    counter!(ORDER_RETRIES).increment(1);
}

/// Record a published status event.
pub fn record_status_event(status: OrderStatus) {
    counter!(STATUS_EVENTS, "status" => status.as_str()).increment(1);
}

/// Publish the current queue counts.
pub fn set_queue_stats(stats: &QueueStats) {
    let states = [
        ("waiting", stats.waiting),
        ("delayed", stats.delayed),
        ("active", stats.active),
        ("completed", stats.completed),
        ("failed", stats.failed),
    ];
    for (state, count) in states {
        gauge!(QUEUE_JOBS, "state" => state).set(count as f64);
    }
}

/// Record how long a venue took to quote.
pub fn record_quote_latency(venue: Venue, duration: Duration) {
    histogram!(QUOTE_LATENCY, "venue" => venue.as_str()).record(duration.as_secs_f64());
}

/// Record a failed settlement on `venue`.
pub fn record_settlement_failure(venue: Venue) {
    counter!(SETTLEMENT_FAILURES, "venue" => venue.as_str()).increment(1);
}

/// Record the duration of one execution attempt.
pub fn record_execution_duration(duration: Duration, success: bool) {
    let outcome = if success { "confirmed" } else { "failed" };
    histogram!(EXECUTION_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_order_submitted();
        record_status_event(OrderStatus::Routing);
        record_quote_latency(Venue::Raydium, Duration::from_millis(200));
        record_execution_duration(Duration::from_millis(5), false);
        set_queue_stats(&QueueStats::default());
    }
}
