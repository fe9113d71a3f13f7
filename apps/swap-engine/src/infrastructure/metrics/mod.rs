//! Prometheus Metrics Module
//!
//! Installs the Prometheus recorder and describes the pipeline metrics
//! recorded by [`crate::application::metrics`].
//!
//! # Metrics Categories
//!
//! - **Orders**: submissions and final outcomes
//! - **Queue**: waiting, delayed, active, completed and failed jobs
//! - **Venues**: quote latency and settlement failures per venue
//! - **Execution**: duration of each execution attempt and status events
//!
//! # Integration
//!
//! Metrics are rendered at `/metrics` on the HTTP port. Recording before
//! [`init_metrics`] is a no-op.

use std::sync::OnceLock;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::application::metrics::{
    EXECUTION_DURATION, ORDER_RETRIES, ORDERS_CONFIRMED, ORDERS_FAILED, ORDERS_SUBMITTED,
    QUEUE_JOBS, QUOTE_LATENCY, SETTLEMENT_FAILURES, STATUS_EVENTS,
};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Subsequent calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Order counters
    describe_counter!(ORDERS_SUBMITTED, "Total orders accepted by the API");
    describe_counter!(ORDERS_CONFIRMED, "Total orders settled successfully");
    describe_counter!(
        ORDERS_FAILED,
        "Total orders failed after exhausting retries or on shutdown"
    );
    describe_counter!(
        ORDER_RETRIES,
        "Total execution attempts scheduled for retry"
    );
    describe_counter!(STATUS_EVENTS, "Total status events published by status");

    // Queue gauges
    describe_gauge!(QUEUE_JOBS, "Queue jobs by state");

    // Venue metrics
    describe_histogram!(QUOTE_LATENCY, "Time to obtain a quote from a venue");
    describe_counter!(
        SETTLEMENT_FAILURES,
        "Total simulated settlement failures by venue"
    );

    // Execution latency
    describe_histogram!(
        EXECUTION_DURATION,
        "Duration of one execution attempt from routing to outcome"
    );
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::metrics::{
        record_order_submitted, record_settlement_failure, set_queue_stats,
    };
    use crate::application::services::QueueStats;
    use crate::domain::venue_routing::Venue;

    #[test]
    fn init_is_idempotent_and_renders() {
        let first = init_metrics().unwrap();
        let second = init_metrics().unwrap();

        record_order_submitted();
        record_settlement_failure(Venue::Meteora);
        set_queue_stats(&QueueStats {
            waiting: 2,
            ..QueueStats::default()
        });

        let rendered = second.render();
        assert!(rendered.contains(ORDERS_SUBMITTED));
        assert!(rendered.contains(QUEUE_JOBS));
        assert!(get_metrics_handle().is_some());
        drop(first);
    }
}
