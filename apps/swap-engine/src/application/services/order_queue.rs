//! Order Queue
//!
//! Holds orders awaiting execution and dispatches them to the
//! [`ExecutionCoordinator`] under a global concurrency cap. Failed attempts
//! are parked as `delayed` for an exponential backoff and then re-queued at
//! the back of the waiting list, up to a bounded number of attempts.
//!
//! Dispatch is condition-driven: an enqueue, a job completion and a retry
//! becoming eligible each try to start work directly. There is no polling.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::application::ports::Delay;
use crate::application::services::backoff::RetryPolicy;
use crate::application::services::execution_coordinator::{
    AttemptContext, AttemptFailure, ExecutionCoordinator,
};
use crate::domain::order_execution::{Order, OrderRepository, OrderStatus};
use crate::domain::shared::OrderId;
use crate::application::metrics;

/// Default number of orders processed at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

const SHUTDOWN_REASON: &str = "Queue shut down before the order finished";
const ABORTED_REASON: &str = "Execution aborted unexpectedly";

// =============================================================================
// Types
// =============================================================================

/// Queue configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of active jobs.
    pub concurrency: usize,
    /// Attempt limit and backoff.
    pub retry: RetryPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Lifecycle of a queue job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a free slot.
    Waiting,
    /// Backing off before a retry.
    Delayed,
    /// Being executed.
    Active,
    /// Executed successfully.
    Completed,
    /// Retries exhausted.
    Failed,
}

/// One order tracked by the queue.
#[derive(Debug, Clone)]
pub struct QueueJob {
    order: Order,
    attempts: u32,
    status: JobStatus,
    last_error: Option<String>,
    enqueued_at: DateTime<Utc>,
    retry_at: Option<DateTime<Utc>>,
}

impl QueueJob {
    fn new(order: Order) -> Self {
        Self {
            order,
            attempts: 0,
            status: JobStatus::Waiting,
            last_error: None,
            enqueued_at: Utc::now(),
            retry_at: None,
        }
    }

    /// Order snapshot as of the last state change of the job.
    #[must_use]
    pub const fn order(&self) -> &Order {
        &self.order
    }

    /// Attempts started.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Job status.
    #[must_use]
    pub const fn status(&self) -> JobStatus {
        self.status
    }

    /// Error of the most recent failed attempt.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// When the job entered the queue.
    #[must_use]
    pub const fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// When a delayed job becomes eligible again.
    #[must_use]
    pub const fn retry_at(&self) -> Option<DateTime<Utc>> {
        self.retry_at
    }
}

/// Job counts per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Jobs waiting for a slot.
    pub waiting: usize,
    /// Jobs backing off before a retry.
    pub delayed: usize,
    /// Jobs executing.
    pub active: usize,
    /// Jobs completed.
    pub completed: usize,
    /// Jobs permanently failed.
    pub failed: usize,
    /// Sum of all of the above.
    pub total: usize,
}

/// Enqueue rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The queue no longer accepts work.
    #[error("queue is shutting down")]
    ShuttingDown,
    /// The order is already queued or running.
    #[error("order {0} is already queued")]
    Duplicate(OrderId),
}

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct QueueState {
    waiting: VecDeque<QueueJob>,
    delayed: HashMap<OrderId, QueueJob>,
    active: HashMap<OrderId, QueueJob>,
    completed: Vec<QueueJob>,
    failed: Vec<QueueJob>,
    /// Jobs taken out of `waiting`, `delayed` or `active` whose final
    /// failure is still being persisted and announced.
    finalizing: usize,
    peak_active: usize,
    shutting_down: bool,
}

impl QueueState {
    fn stats(&self) -> QueueStats {
        let waiting = self.waiting.len();
        let delayed = self.delayed.len();
        let active = self.active.len();
        let completed = self.completed.len();
        let failed = self.failed.len();
        QueueStats {
            waiting,
            delayed,
            active,
            completed,
            failed,
            total: waiting + delayed + active + completed + failed,
        }
    }

    fn is_idle(&self) -> bool {
        self.waiting.is_empty()
            && self.delayed.is_empty()
            && self.active.is_empty()
            && self.finalizing == 0
    }

    fn is_pending(&self, id: &OrderId) -> bool {
        self.active.contains_key(id)
            || self.delayed.contains_key(id)
            || self.waiting.iter().any(|j| j.order.id() == id)
    }

    fn find(&self, id: &OrderId) -> Option<&QueueJob> {
        self.active
            .get(id)
            .or_else(|| self.delayed.get(id))
            .or_else(|| self.waiting.iter().find(|j| j.order.id() == id))
            .or_else(|| self.completed.iter().find(|j| j.order.id() == id))
            .or_else(|| self.failed.iter().find(|j| j.order.id() == id))
    }
}

struct QueueInner<O: OrderRepository> {
    config: QueueConfig,
    coordinator: ExecutionCoordinator<O>,
    delay: Arc<dyn Delay>,
    state: Mutex<QueueState>,
    idle: Notify,
    cancel: CancellationToken,
}

impl<O: OrderRepository> QueueInner<O> {
    /// Publish gauges and wake idle waiters. Called with the state lock held.
    fn after_change(&self, state: &QueueState) {
        metrics::set_queue_stats(&state.stats());
        if state.is_idle() {
            self.idle.notify_waiters();
        }
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Concurrency-bounded order queue with retry and backoff.
pub struct OrderQueue<O: OrderRepository> {
    inner: Arc<QueueInner<O>>,
}

impl<O: OrderRepository> Clone for OrderQueue<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: OrderRepository + 'static> OrderQueue<O> {
    /// Create a queue. `delay` drives retry backoff.
    pub fn new(
        config: QueueConfig,
        coordinator: ExecutionCoordinator<O>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                config,
                coordinator,
                delay,
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Queue configuration.
    #[must_use]
    pub fn config(&self) -> QueueConfig {
        self.inner.config
    }

    /// Append an order to the waiting list and try to start it.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the queue is shutting down or already tracks the order.
    pub fn enqueue(&self, order: Order) -> Result<(), QueueError> {
        {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return Err(QueueError::ShuttingDown);
            }
            if state.is_pending(order.id()) {
                return Err(QueueError::Duplicate(order.id().clone()));
            }
            tracing::debug!(order_id = %order.id(), waiting = state.waiting.len() + 1, "Order enqueued");
            state.waiting.push_back(QueueJob::new(order));
            self.inner.after_change(&state);
        }
        dispatch(&self.inner);
        Ok(())
    }

    /// Current job counts.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.inner.state.lock().stats()
    }

    /// Look up a job in any collection.
    #[must_use]
    pub fn get_job(&self, id: &OrderId) -> Option<QueueJob> {
        self.inner.state.lock().find(id).cloned()
    }

    /// Highest number of simultaneously active jobs seen so far.
    #[must_use]
    pub fn peak_active(&self) -> usize {
        self.inner.state.lock().peak_active
    }

    /// Whether new orders are accepted.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.inner.state.lock().shutting_down
    }

    /// Resolve once no job is waiting, delayed or active.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting and dispatching work.
    ///
    /// Waiting jobs are failed without running. Delayed jobs leave their
    /// backoff early and fail. Active jobs observe cancellation at their next
    /// suspension point and finish as failed without retry. Every one of them
    /// is persisted as failed and announced with a final `failed` event, so
    /// [`wait_idle`](Self::wait_idle) resolves once that is done.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn shutdown(&self) {
        let abandoned: Vec<QueueJob> = {
            let mut state = self.inner.state.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
            let abandoned: Vec<QueueJob> = state.waiting.drain(..).collect();
            state.finalizing += abandoned.len();
            tracing::info!(
                waiting = abandoned.len(),
                delayed = state.delayed.len(),
                active = state.active.len(),
                "Order queue shutting down"
            );
            self.inner.after_change(&state);
            abandoned
        };
        self.inner.cancel.cancel();

        for job in abandoned {
            tokio::spawn(finish_abandoned(Arc::clone(&self.inner), job, SHUTDOWN_REASON));
        }
    }
}

impl<O: OrderRepository> std::fmt::Debug for OrderQueue<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderQueue")
            .field("config", &self.inner.config)
            .field("stats", &self.inner.state.lock().stats())
            .finish()
    }
}

/// Start waiting jobs, oldest first, while slots are free.
fn dispatch<O: OrderRepository + 'static>(inner: &Arc<QueueInner<O>>) {
    let mut started = Vec::new();
    {
        let mut state = inner.state.lock();
        if state.shutting_down {
            return;
        }
        while state.active.len() < inner.config.concurrency {
            let Some(mut job) = state.waiting.pop_front() else {
                break;
            };
            job.attempts += 1;
            job.status = JobStatus::Active;
            job.retry_at = None;
            let ctx = AttemptContext {
                attempt: job.attempts,
                retry_on_failure: inner.config.retry.should_retry(job.attempts),
            };
            let order = job.order.clone();
            state.active.insert(order.id().clone(), job);
            started.push((order, ctx));
        }
        state.peak_active = state.peak_active.max(state.active.len());
        if !started.is_empty() {
            inner.after_change(&state);
        }
    }

    for (order, ctx) in started {
        tracing::debug!(order_id = %order.id(), attempt = ctx.attempt, "Job started");
        tokio::spawn(process(Arc::clone(inner), order, ctx));
    }
}

async fn process<O: OrderRepository + 'static>(
    inner: Arc<QueueInner<O>>,
    mut order: Order,
    ctx: AttemptContext,
) {
    let id = order.id().clone();
    let slot = ActiveSlot::new(Arc::clone(&inner), id.clone());
    let result = inner.coordinator.run(&mut order, ctx, &inner.cancel).await;
    slot.release();

    let AttemptFailure { error, will_retry } = match result {
        Ok(_) => {
            {
                let mut state = inner.state.lock();
                if let Some(mut job) = state.active.remove(&id) {
                    job.order = order;
                    job.status = JobStatus::Completed;
                    state.completed.push(job);
                }
                inner.after_change(&state);
            }
            metrics::record_order_confirmed();
            inner.coordinator.hub().close(&id);
            dispatch(&inner);
            return;
        }
        Err(failure) => failure,
    };

    let backoff = inner.config.retry.backoff_for(ctx.attempt);
    {
        let mut state = inner.state.lock();
        let Some(mut job) = state.active.remove(&id) else {
            inner.after_change(&state);
            return;
        };
        job.order = order;
        job.last_error = Some(error.to_string());

        if will_retry {
            job.status = JobStatus::Delayed;
            job.retry_at = chrono::Duration::from_std(backoff)
                .ok()
                .and_then(|d| Utc::now().checked_add_signed(d));
            state.delayed.insert(id.clone(), job);
        } else {
            job.status = JobStatus::Failed;
            state.failed.push(job);
        }
        inner.after_change(&state);
    }

    if !will_retry {
        tracing::warn!(order_id = %id, attempts = ctx.attempt, error = %error, "Order permanently failed");
        metrics::record_order_failed();
        inner.coordinator.hub().close(&id);
        dispatch(&inner);
        return;
    }

    tracing::info!(
        order_id = %id,
        attempt = ctx.attempt,
        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
        "Retrying order after backoff"
    );
    metrics::record_retry();
    // The freed slot can take another waiting job while this one backs off.
    dispatch(&inner);

    let slept = inner.delay.sleep(backoff, &inner.cancel).await;
    let abandoned = {
        let mut state = inner.state.lock();
        let Some(mut job) = state.delayed.remove(&id) else {
            return;
        };
        if slept.is_err() || state.shutting_down {
            state.finalizing += 1;
            Some(job)
        } else {
            job.status = JobStatus::Waiting;
            job.retry_at = None;
            state.waiting.push_back(job);
            inner.after_change(&state);
            None
        }
    };
    match abandoned {
        Some(job) => finish_abandoned(inner, job, SHUTDOWN_REASON).await,
        None => dispatch(&inner),
    }
}

/// Persist and announce the final failure of a job the queue gives up on.
///
/// The caller has already taken the job out of its collection and counted
/// it in `finalizing`.
async fn finish_abandoned<O: OrderRepository + 'static>(
    inner: Arc<QueueInner<O>>,
    mut job: QueueJob,
    reason: &'static str,
) {
    let id = job.order.id().clone();
    job.order = inner
        .coordinator
        .abandon(job.order.clone(), job.attempts, reason)
        .await;
    let confirmed = job.order.status() == OrderStatus::Confirmed;
    {
        let mut state = inner.state.lock();
        state.finalizing = state.finalizing.saturating_sub(1);
        job.retry_at = None;
        if confirmed {
            job.status = JobStatus::Completed;
            state.completed.push(job);
        } else {
            job.status = JobStatus::Failed;
            job.last_error = Some(reason.to_string());
            state.failed.push(job);
        }
        inner.after_change(&state);
    }
    if confirmed {
        metrics::record_order_confirmed();
    } else {
        metrics::record_order_failed();
    }
    inner.coordinator.hub().close(&id);
    dispatch(&inner);
}

/// Active slot of a running job.
///
/// If the job's task unwinds before [`ActiveSlot::release`], dropping the
/// slot frees it and hands the job to [`finish_abandoned`].
struct ActiveSlot<O: OrderRepository + 'static> {
    inner: Arc<QueueInner<O>>,
    id: OrderId,
    armed: bool,
}

impl<O: OrderRepository + 'static> ActiveSlot<O> {
    const fn new(inner: Arc<QueueInner<O>>, id: OrderId) -> Self {
        Self {
            inner,
            id,
            armed: true,
        }
    }

    /// The attempt returned normally; the caller records its outcome.
    fn release(mut self) {
        self.armed = false;
    }
}

impl<O: OrderRepository + 'static> Drop for ActiveSlot<O> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let job = {
            let mut state = self.inner.state.lock();
            let job = state.active.remove(&self.id);
            if job.is_some() {
                state.finalizing += 1;
            }
            self.inner.after_change(&state);
            job
        };
        let Some(job) = job else {
            return;
        };
        tracing::error!(order_id = %self.id, "Execution task aborted");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(finish_abandoned(Arc::clone(&self.inner), job, ABORTED_REASON));
            }
            Err(_) => {
                let mut state = self.inner.state.lock();
                state.finalizing = state.finalizing.saturating_sub(1);
                state.failed.push(QueueJob {
                    status: JobStatus::Failed,
                    last_error: Some(ABORTED_REASON.to_string()),
                    ..job
                });
                self.inner.after_change(&state);
            }
        }
    }
}
