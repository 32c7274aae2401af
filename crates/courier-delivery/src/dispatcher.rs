//! Event fan-out.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use courier_types::{DeliveryLedger, DeliveryRecord, SubscriptionRegistry};
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::DispatchError;
use crate::executor::DeliveryExecutor;

/// Default cap on in-flight deliveries across all dispatches.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// What happened to one `dispatch` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Active subscriptions that wanted the event.
    pub matched: usize,
    /// Deliveries that got a 2xx response.
    pub succeeded: usize,
    /// Deliveries that did not.
    pub failed: usize,
    /// Records that could not be written to the ledger.
    pub ledger_failures: usize,
}

/// How one fan-out task ended.
struct TaskResult {
    success: bool,
    recorded: bool,
}

/// Routes events to every matching subscriber.
///
/// Subscribers are resolved once per dispatch and delivered to
/// concurrently, bounded by a semaphore shared by all dispatches on this
/// dispatcher. Each attempt produces exactly one ledger append.
///
/// Dispatches started with [`Dispatcher::fire`] are tracked so that
/// [`Dispatcher::shutdown`] can wait for their ledger writes.
pub struct Dispatcher<R, L> {
    registry: Arc<R>,
    ledger: Arc<L>,
    executor: Arc<DeliveryExecutor>,
    permits: Arc<Semaphore>,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl<R, L> Clone for Dispatcher<R, L> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            ledger: Arc::clone(&self.ledger),
            executor: Arc::clone(&self.executor),
            permits: Arc::clone(&self.permits),
            background: Arc::clone(&self.background),
        }
    }
}

impl<R, L> Dispatcher<R, L>
where
    R: SubscriptionRegistry,
    L: DeliveryLedger,
{
    /// Creates a dispatcher. `max_concurrency` is clamped to at least one.
    pub fn new(
        registry: Arc<R>,
        ledger: Arc<L>,
        executor: DeliveryExecutor,
        max_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            ledger,
            executor: Arc::new(executor),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
            background: Arc::default(),
        }
    }

    /// The registry this dispatcher reads from.
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// The ledger this dispatcher appends to.
    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// Delivers `payload` to every active subscriber of `event` and waits
    /// for all attempts and their ledger writes to finish.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` only if the subscriber lookup fails; no
    /// delivery has been attempted in that case. Individual delivery and
    /// ledger failures are counted in the summary instead.
    pub async fn dispatch(&self, event: &str, payload: Value) -> Result<DispatchSummary, DispatchError> {
        let registry = Arc::clone(&self.registry);
        let lookup_event = event.to_string();
        let subscriptions = tokio::task::spawn_blocking(move || registry.find_active(&lookup_event))
            .await?
            .map_err(|e| DispatchError::Registry(Box::new(e)))?;

        let mut summary = DispatchSummary {
            matched: subscriptions.len(),
            ..Default::default()
        };

        if subscriptions.is_empty() {
            tracing::debug!(event, "no subscribers for event");
            return Ok(summary);
        }

        let event: Arc<str> = Arc::from(event);
        let payload = Arc::new(payload);
        let mut tasks = JoinSet::new();

        for subscription in subscriptions {
            let executor = Arc::clone(&self.executor);
            let ledger = Arc::clone(&self.ledger);
            let permits = Arc::clone(&self.permits);
            let event = Arc::clone(&event);
            let payload = Arc::clone(&payload);

            tasks.spawn(async move {
                // Acquisition only fails on a closed semaphore; proceed unthrottled.
                let permit = permits.acquire_owned().await.ok();
                let record = executor.deliver(&subscription, &event, &payload).await;
                drop(permit);

                let success = record.success;
                let recorded = append(ledger, record).await;
                TaskResult { success, recorded }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if result.success {
                        summary.succeeded += 1;
                    } else {
                        summary.failed += 1;
                    }
                    if !result.recorded {
                        summary.ledger_failures += 1;
                    }
                }
                Err(e) => {
                    tracing::error!(event = %event, error = %e, "delivery task aborted");
                    summary.failed += 1;
                    summary.ledger_failures += 1;
                }
            }
        }

        tracing::info!(
            event = %event,
            matched = summary.matched,
            succeeded = summary.succeeded,
            failed = summary.failed,
            ledger_failures = summary.ledger_failures,
            "dispatch complete"
        );

        Ok(summary)
    }

    /// Starts a dispatch in the background and returns immediately.
    ///
    /// The outcome is only logged. Must be called from within a tokio runtime.
    pub fn fire(&self, event: impl Into<String>, payload: Value) {
        let dispatcher = self.clone();
        let event = event.into();

        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        // Reap finished dispatches so the set only holds live ones.
        while background.try_join_next().is_some() {}
        background.spawn(async move {
            if let Err(e) = dispatcher.dispatch(&event, payload).await {
                tracing::error!(event = %event, error = %e, "dispatch failed");
            }
        });
    }

    /// Number of fired dispatches that have not finished yet.
    pub fn pending(&self) -> usize {
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        while background.try_join_next().is_some() {}
        background.len()
    }

    /// Waits up to `grace` for every fired dispatch to finish.
    ///
    /// Dispatches still running when `grace` elapses are aborted and logged;
    /// their count is returned. Dispatches fired after this call starts are
    /// not waited for.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut running = std::mem::take(
            &mut *self.background.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if running.is_empty() {
            return 0;
        }

        tracing::info!(pending = running.len(), "waiting for fired dispatches");
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = running.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "fired dispatch aborted");
                }
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }

        let abandoned = running.len();
        tracing::warn!(
            abandoned,
            grace_ms = grace.as_millis() as u64,
            "fired dispatches did not finish before shutdown; their attempts may be unrecorded"
        );
        running.shutdown().await;
        abandoned
    }
}

/// Appends `record` on the blocking pool. Returns whether it was stored.
async fn append<L: DeliveryLedger>(ledger: Arc<L>, record: DeliveryRecord) -> bool {
    let id = record.id;
    let subscription_id = record.subscription_id;
    let event = record.event.clone();

    match tokio::task::spawn_blocking(move || ledger.record(&record)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(
                delivery_id = %id,
                subscription_id = %subscription_id,
                event = %event,
                error = %e,
                "failed to record delivery"
            );
            false
        }
        Err(e) => {
            tracing::error!(
                delivery_id = %id,
                subscription_id = %subscription_id,
                event = %event,
                error = %e,
                "ledger write task aborted"
            );
            false
        }
    }
}
