//! Search error tracker: classification, retries and the circuit breaker
//! behind one observable `ErrorState`.
//!
//! # Responsibilities
//! - Turn failures into `ErrorState` (nothing is re-thrown to callers)
//! - Drive backoff retries through a single cancellable timer
//! - Open the circuit after a run of consecutive failures, close it after a window
//! - Report every transition to the injected telemetry sink
//!
//! # Design Decisions
//! - Handles are cheap clones sharing one state; the last drop disposes
//! - The state mutex is never held across an await, while calling the sink,
//!   or while publishing to subscribers
//! - Dropping a `retry` future mid-wait clears `is_retrying`
//! - After `dispose` every operation is a no-op on state and telemetry

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tokio::sync::watch;

use crate::observability::metrics;
use crate::observability::telemetry::{TelemetryEvent, TelemetrySink};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::classifier::{classify, Classification, SearchFailure};
use crate::resilience::policy::ResiliencePolicy;
use crate::resilience::state::{ErrorKind, ErrorState};
use crate::resilience::timer::{self, TimerOutcome, TimerSlot, TimerTicket};

pub const MAX_RETRIES_MESSAGE: &str = "Maximum retry attempts reached. Please try again later.";
pub const RETRY_CANCELLED_MESSAGE: &str = "Retry cancelled";

/// How a call to [`SearchErrorTracker::retry`] ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The search ran after the delay and succeeded.
    Succeeded(T),
    /// The search ran after the delay and failed again.
    Failed(Classification),
    /// The retry budget was already spent; the search was not run.
    Exhausted,
    /// The timer was cancelled or the tracker disposed before the search ran.
    Cancelled,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded(_))
    }
}

struct Inner {
    state: ErrorState,
    breaker: CircuitBreaker,
    retry_timer: TimerSlot,
    disposed: bool,
    version: u64,
}

impl Inner {
    /// Snapshot the state for publishing once the lock is released.
    fn stamp(&mut self) -> StateUpdate {
        self.version += 1;
        StateUpdate {
            version: self.version,
            state: self.state.clone(),
        }
    }
}

struct StateUpdate {
    version: u64,
    state: ErrorState,
}

struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ErrorState>,
    published: Mutex<u64>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called without the `inner` lock held. Updates that lost a
    /// race to a newer one are dropped.
    fn publish(&self, update: StateUpdate) {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if update.version > *published {
            *published = update.version;
            self.state_tx.send_replace(update.state);
        }
    }
}

/// Clears `is_retrying` if a `retry` future is dropped mid-cycle, either
/// while waiting on its timer or while its search is in flight.
struct PendingRetry<'a> {
    shared: &'a Shared,
    ticket: Option<TimerTicket>,
    searching: bool,
}

impl PendingRetry<'_> {
    /// Release the timer. False if it was cancelled, replaced or disposed.
    fn release(&mut self) -> bool {
        let Some(ticket) = self.ticket.take() else {
            return false;
        };
        let mut inner = self.shared.lock();
        let released = inner.retry_timer.release(ticket) && !inner.disposed;
        self.searching = released;
        released
    }

    fn finish(&mut self) {
        self.searching = false;
    }
}

impl Drop for PendingRetry<'_> {
    fn drop(&mut self) {
        if self.ticket.is_none() && !self.searching {
            return;
        }

        let update = {
            let mut inner = self.shared.lock();
            // A newer retry or a cancel already owns the state.
            let owned = match self.ticket.take() {
                Some(ticket) => inner.retry_timer.release(ticket),
                None => !inner.retry_timer.is_armed(),
            };
            if !owned || inner.disposed || !inner.state.is_retrying {
                return;
            }
            inner.state.is_retrying = false;
            inner.stamp()
        };
        self.shared.publish(update);
        tracing::debug!("Unfinished search retry dropped");
    }
}

/// One search surface's error state machine.
#[derive(Clone)]
pub struct SearchErrorTracker {
    shared: Arc<Shared>,
    policy: Arc<ResiliencePolicy>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl SearchErrorTracker {
    pub fn new(policy: ResiliencePolicy, telemetry: Arc<dyn TelemetrySink>) -> Self {
        let state = ErrorState::new(policy.max_retries);
        let (state_tx, _) = watch::channel(state.clone());
        let inner = Inner {
            state,
            breaker: CircuitBreaker::new(policy.failure_threshold, policy.open_window),
            retry_timer: TimerSlot::new(),
            disposed: false,
            version: 0,
        };

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                state_tx,
                published: Mutex::new(0),
            }),
            policy: Arc::new(policy),
            telemetry,
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> ErrorState {
        self.shared.lock().state.clone()
    }

    /// Receiver that observes every state change.
    ///
    /// Reading the tracker while holding `borrow()` is fine; calling an
    /// operation that changes state while holding it blocks forever.
    pub fn subscribe(&self) -> watch::Receiver<ErrorState> {
        self.shared.state_tx.subscribe()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.shared.lock().breaker.consecutive_failures()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Record a failed search.
    pub fn handle_search_error(&self, failure: &SearchFailure) -> Classification {
        let classification = classify(Some(failure));

        let (properties, opened, update) = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return classification;
            }

            let tripped = inner.breaker.record_failure();
            inner.state.kind = classification.kind;
            inner.state.message = classification.message.clone();
            inner.state.is_retrying = false;

            let opened = tripped && !inner.state.is_circuit_open;
            if opened {
                inner.state.is_circuit_open = true;
                self.schedule_circuit_close(&mut inner);
            }
            let update = inner.stamp();

            let failures = inner.breaker.consecutive_failures();
            let properties = json!({
                "error_type": classification.kind.as_str(),
                "retry_count": inner.state.retry_count,
                "consecutive_failures": failures,
                "status": failure.status(),
                "failover_reason": classification.failover_reason,
                "retry_after_secs": classification.retry_after.map(|d| d.as_secs()),
            });
            (properties, opened.then_some(failures), update)
        };
        self.shared.publish(update);

        tracing::warn!(
            kind = %classification.kind,
            status = ?failure.status(),
            code = ?failure.code,
            detail = %failure.detail,
            "Search failed"
        );
        self.telemetry.track(TelemetryEvent::SearchError, &properties);

        if let Some(failures) = opened {
            tracing::warn!(
                consecutive_failures = failures,
                open_window_ms = self.policy.open_window.as_millis() as u64,
                "Search circuit opened"
            );
            metrics::record_circuit_state(true);
            self.telemetry.track(
                TelemetryEvent::CircuitBreakerOpened,
                &json!({
                    "consecutive_failures": failures,
                    "open_window_ms": self.policy.open_window.as_millis() as u64,
                }),
            );
        }

        classification
    }

    /// Record a successful search, resetting everything.
    pub fn handle_search_success(&self) {
        let (was_open, update) = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }

            inner.retry_timer.cancel();
            inner.breaker.record_success();
            let was_open = inner.state.is_circuit_open;
            inner.state = ErrorState::new(self.policy.max_retries);
            (was_open, inner.stamp())
        };
        self.shared.publish(update);

        if was_open {
            metrics::record_circuit_state(false);
        }
        tracing::debug!("Search succeeded, error state reset");
    }

    /// Wait out the backoff delay, then run `search_fn` once.
    pub async fn retry<F, Fut, T>(&self, search_fn: F) -> RetryOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, SearchFailure>>,
    {
        let (ticket, cancelled, delay, retry_count) = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return RetryOutcome::Cancelled;
            }

            if inner.state.retry_count >= self.policy.max_retries {
                inner.state.message = Some(MAX_RETRIES_MESSAGE.to_string());
                let update = inner.stamp();
                drop(inner);
                self.shared.publish(update);
                tracing::info!(max_retries = self.policy.max_retries, "Search retry budget exhausted");
                return RetryOutcome::Exhausted;
            }

            let delay = self.policy.backoff.delay_for(inner.state.retry_count);
            inner.state.is_retrying = true;
            inner.state.retry_count += 1;
            let (ticket, cancelled) = inner.retry_timer.arm();
            let retry_count = inner.state.retry_count;
            let update = inner.stamp();
            drop(inner);
            self.shared.publish(update);
            (ticket, cancelled, delay, retry_count)
        };
        let mut pending = PendingRetry {
            shared: &self.shared,
            ticket: Some(ticket),
            searching: false,
        };

        tracing::info!(retry_count, delay = ?delay, "Retrying search");
        self.telemetry.track(
            TelemetryEvent::SearchRetry,
            &json!({
                "retry_count": retry_count,
                "delay_ms": delay.as_millis() as u64,
            }),
        );

        if timer::wait(delay, cancelled).await == TimerOutcome::Cancelled {
            return RetryOutcome::Cancelled;
        }

        // A cancel racing the deadline still counts as a cancel.
        if !pending.release() {
            return RetryOutcome::Cancelled;
        }

        let result = search_fn().await;
        pending.finish();

        match result {
            Ok(value) => {
                self.handle_search_success();
                RetryOutcome::Succeeded(value)
            }
            Err(failure) => RetryOutcome::Failed(self.handle_search_error(&failure)),
        }
    }

    /// Hide the current error without touching retries or the circuit.
    pub fn dismiss_error(&self) {
        let (properties, update) = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }

            let properties = json!({
                "error_type": inner.state.kind.as_str(),
                "retry_count": inner.state.retry_count,
            });
            inner.state.kind = ErrorKind::None;
            inner.state.is_retrying = false;
            (properties, inner.stamp())
        };
        self.shared.publish(update);

        self.telemetry.track(TelemetryEvent::ErrorDismissed, &properties);
    }

    /// Abort a pending retry before its search runs.
    pub fn cancel_retry(&self) {
        let (retry_count, update) = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }

            inner.retry_timer.cancel();
            inner.state.is_retrying = false;
            inner.state.message = Some(RETRY_CANCELLED_MESSAGE.to_string());
            (inner.state.retry_count, inner.stamp())
        };
        self.shared.publish(update);

        tracing::info!(retry_count, "Search retry cancelled");
        self.telemetry.track(
            TelemetryEvent::RetryCancelled,
            &json!({ "retry_count": retry_count }),
        );
    }

    /// Stop all timers; the tracker ignores every later call.
    pub fn dispose(&self) {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        inner.retry_timer.cancel();
        inner.breaker.abort_close();
        drop(inner);
        tracing::debug!("Search error tracker disposed");
    }

    fn schedule_circuit_close(&self, inner: &mut Inner) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, circuit stays open until the next success");
            return;
        };

        let shared = Arc::downgrade(&self.shared);
        let window = inner.breaker.open_for();
        let task = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };

            let mut inner = shared.lock();
            inner.breaker.close_fired();
            if inner.disposed {
                return;
            }
            inner.state.is_circuit_open = false;
            let update = inner.stamp();
            drop(inner);
            shared.publish(update);

            metrics::record_circuit_state(false);
            tracing::info!("Search circuit closed after cooldown");
        });
        inner.breaker.schedule_close(task);
    }
}

impl std::fmt::Debug for SearchErrorTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchErrorTracker")
            .field("state", &self.state())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::classifier::SearchFailure;
    use reqwest::header::{HeaderMap, HeaderValue};
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(TelemetryEvent, Value)>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<(TelemetryEvent, Value)> {
            self.events.lock().unwrap().clone()
        }

        fn count(&self, event: TelemetryEvent) -> usize {
            self.events().iter().filter(|(e, _)| *e == event).count()
        }
    }

    impl TelemetrySink for RecordingSink {
        fn track(&self, event: TelemetryEvent, properties: &Value) {
            self.events.lock().unwrap().push((event, properties.clone()));
        }
    }

    fn tracker() -> (SearchErrorTracker, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        (SearchErrorTracker::new(ResiliencePolicy::default(), sink.clone()), sink)
    }

    fn unavailable() -> SearchFailure {
        SearchFailure::from_response(503, HeaderMap::new())
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_sets_state_and_tracks() {
        let (tracker, sink) = tracker();
        let classification = tracker.handle_search_error(&unavailable());

        let state = tracker.state();
        assert_eq!(classification.kind, ErrorKind::Error);
        assert_eq!(state.kind, ErrorKind::Error);
        assert!(state.message.unwrap().contains("temporarily unavailable"));
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_retrying);
        assert!(!state.is_circuit_open);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, TelemetryEvent::SearchError);
        assert_eq!(events[0].1["error_type"], "error");
        assert_eq!(events[0].1["retry_count"], 0);
        assert_eq!(events[0].1["status"], 503);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_response_is_failover() {
        let (tracker, _) = tracker();
        let mut headers = HeaderMap::new();
        headers.insert("x-search-status", HeaderValue::from_static("degraded"));
        tracker.handle_search_error(&SearchFailure::from_response(200, headers));
        assert_eq!(tracker.state().kind, ErrorKind::Failover);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_everything() {
        let (tracker, _) = tracker();
        for _ in 0..5 {
            tracker.handle_search_error(&unavailable());
        }
        assert!(tracker.state().is_circuit_open);

        tracker.handle_search_success();
        assert_eq!(tracker.state(), ErrorState::new(3));
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_resolving_after_first_delay() {
        let (tracker, sink) = tracker();
        tracker.handle_search_error(&unavailable());

        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();
        let c = calls.clone();
        let outcome = tracker
            .retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>("results")
            })
            .await;

        assert_eq!(start.elapsed(), Duration::from_millis(1000));
        assert!(matches!(outcome, RetryOutcome::Succeeded("results")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let state = tracker.state();
        assert_eq!(state.kind, ErrorKind::None);
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_retrying);

        let retries: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|(e, _)| *e == TelemetryEvent::SearchRetry)
            .collect();
        assert_eq!(retries.len(), 1);
        assert_eq!(retries[0].1["retry_count"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_not_called_before_delay() {
        let (tracker, sink) = tracker();
        let calls = Arc::new(AtomicU32::new(0));

        let t = tracker.clone();
        let c = calls.clone();
        let handle = tokio::spawn(async move {
            t.retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>(())
            })
            .await
        });

        settle().await;
        let state = tracker.state();
        assert!(state.is_retrying);
        assert_eq!(state.retry_count, 1);
        assert_eq!(sink.count(TelemetryEvent::SearchRetry), 1);

        tokio::time::advance(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_and_budget() {
        let (tracker, _) = tracker();
        let calls = Arc::new(AtomicU32::new(0));

        for expected_ms in [1000, 2000, 4000] {
            let c = calls.clone();
            let start = Instant::now();
            let outcome = tracker
                .retry(|| async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(unavailable())
                })
                .await;
            assert_eq!(start.elapsed(), Duration::from_millis(expected_ms));
            assert!(matches!(outcome, RetryOutcome::Failed(_)));
        }

        let state = tracker.state();
        assert_eq!(state.retry_count, 3);
        assert_eq!(state.kind, ErrorKind::Error);
        assert!(!state.is_retrying);

        let c = calls.clone();
        let start = Instant::now();
        let outcome = tracker
            .retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>(())
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::Exhausted));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(tracker
            .state()
            .message
            .unwrap()
            .to_lowercase()
            .contains("maximum retry"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_five_consecutive_errors_open_then_close() {
        let (tracker, sink) = tracker();
        for i in 1..=5 {
            tracker.handle_search_error(&unavailable());
            assert_eq!(tracker.state().is_circuit_open, i == 5);
        }
        assert_eq!(sink.count(TelemetryEvent::CircuitBreakerOpened), 1);

        tokio::time::sleep(Duration::from_millis(29_999)).await;
        assert!(tracker.state().is_circuit_open);

        tokio::time::sleep(Duration::from_millis(2)).await;
        settle().await;
        assert!(!tracker.state().is_circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_not_reopened_by_more_failures() {
        let (tracker, sink) = tracker();
        for _ in 0..8 {
            tracker.handle_search_error(&unavailable());
        }
        assert!(tracker.state().is_circuit_open);
        assert_eq!(sink.count(TelemetryEvent::CircuitBreakerOpened), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_breaks_failure_run() {
        let (tracker, sink) = tracker();
        for _ in 0..3 {
            tracker.handle_search_error(&unavailable());
        }
        tracker.handle_search_success();
        for _ in 0..3 {
            tracker.handle_search_error(&unavailable());
        }
        assert!(!tracker.state().is_circuit_open);
        assert_eq!(tracker.consecutive_failures(), 3);
        assert_eq!(sink.count(TelemetryEvent::CircuitBreakerOpened), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_keeps_retry_count() {
        let (tracker, sink) = tracker();
        tracker.handle_search_error(&unavailable());
        let _ = tracker
            .retry(|| async { Err::<(), _>(unavailable()) })
            .await;

        tracker.dismiss_error();
        let state = tracker.state();
        assert_eq!(state.kind, ErrorKind::None);
        assert_eq!(state.retry_count, 1);
        assert!(!state.is_retrying);

        let (event, props) = sink.events().pop().unwrap();
        assert_eq!(event, TelemetryEvent::ErrorDismissed);
        assert_eq!(props["error_type"], "error");
        assert_eq!(props["retry_count"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_retry_stops_pending_search() {
        let (tracker, sink) = tracker();
        let calls = Arc::new(AtomicU32::new(0));

        let t = tracker.clone();
        let c = calls.clone();
        let handle = tokio::spawn(async move {
            t.retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>(())
            })
            .await
        });
        settle().await;

        tracker.cancel_retry();
        let outcome = handle.await.unwrap();
        assert!(matches!(outcome, RetryOutcome::Cancelled));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let state = tracker.state();
        assert!(!state.is_retrying);
        assert_eq!(state.message.as_deref(), Some(RETRY_CANCELLED_MESSAGE));
        assert_eq!(state.retry_count, 1);

        let (event, props) = sink.events().pop().unwrap();
        assert_eq!(event, TelemetryEvent::RetryCancelled);
        assert_eq!(props["retry_count"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_retry_supersedes_pending_one() {
        let (tracker, _) = tracker();

        let t = tracker.clone();
        let first = tokio::spawn(async move {
            t.retry(|| async { Ok::<_, SearchFailure>(1) }).await
        });
        settle().await;

        let second = tracker.retry(|| async { Ok::<_, SearchFailure>(2) }).await;
        assert!(matches!(first.await.unwrap(), RetryOutcome::Cancelled));
        assert!(matches!(second, RetryOutcome::Succeeded(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_mid_retry() {
        let (tracker, sink) = tracker();
        let calls = Arc::new(AtomicU32::new(0));
        let mut rx = tracker.subscribe();

        let t = tracker.clone();
        let c = calls.clone();
        let handle = tokio::spawn(async move {
            t.retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>(())
            })
            .await
        });
        settle().await;
        let before = tracker.state();
        rx.borrow_and_update();

        tokio::time::advance(Duration::from_millis(500)).await;
        tracker.dispose();
        let events_before = sink.events().len();

        assert!(matches!(handle.await.unwrap(), RetryOutcome::Cancelled));
        assert!(tracker.is_disposed());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.state(), before);
        assert!(!rx.has_changed().unwrap());

        tracker.handle_search_error(&unavailable());
        tracker.handle_search_success();
        tracker.cancel_retry();
        assert_eq!(tracker.state(), before);
        assert_eq!(sink.events().len(), events_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_dropped_during_delay_clears_retrying() {
        let (tracker, _) = tracker();
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();

        let timed_out = tokio::time::timeout(
            Duration::from_millis(500),
            tracker.retry(|| async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SearchFailure>(())
            }),
        )
        .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_secs(60)).await;
        let state = tracker.state();
        assert!(!state.is_retrying);
        assert_eq!(state.retry_count, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // The slot is free again, so the next retry runs normally.
        let outcome = tracker.retry(|| async { Ok::<_, SearchFailure>(()) }).await;
        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_dropped_mid_search_clears_retrying() {
        let (tracker, _) = tracker();

        let timed_out = tokio::time::timeout(
            Duration::from_millis(1500),
            tracker.retry(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, SearchFailure>(())
            }),
        )
        .await;
        assert!(timed_out.is_err());
        assert!(!tracker.state().is_retrying);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_retry_leaves_newer_one_retrying() {
        let (tracker, _) = tracker();

        let t = tracker.clone();
        let first = tokio::spawn(async move {
            t.retry(|| async { Ok::<_, SearchFailure>(1) }).await
        });
        settle().await;

        let t = tracker.clone();
        let second = tokio::spawn(async move {
            t.retry(|| async { Ok::<_, SearchFailure>(2) }).await
        });
        settle().await;
        assert!(matches!(first.await.unwrap(), RetryOutcome::Cancelled));

        let state = tracker.state();
        assert!(state.is_retrying);
        assert_eq!(state.retry_count, 2);
        assert!(matches!(second.await.unwrap(), RetryOutcome::Succeeded(2)));
    }

    #[test]
    fn test_state_readable_while_subscriber_borrows() {
        let (tracker, _) = tracker();
        let rx = tracker.subscribe();
        let held = rx.borrow();

        let writer = {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                tracker.handle_search_error(&unavailable());
            })
        };
        std::thread::sleep(Duration::from_millis(50));

        // The writer is parked on the watch channel, not on the state lock.
        assert_eq!(tracker.state().kind, ErrorKind::Error);
        drop(held);

        writer.join().unwrap();
        assert_eq!(rx.borrow().kind, ErrorKind::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_stops_circuit_close() {
        let (tracker, _) = tracker();
        for _ in 0..5 {
            tracker.handle_search_error(&unavailable());
        }
        tracker.dispose();
        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert!(tracker.state().is_circuit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_transitions() {
        let (tracker, _) = tracker();
        let mut rx = tracker.subscribe();

        tracker.handle_search_error(&SearchFailure::network("ECONNREFUSED"));
        assert!(rx.has_changed().unwrap());
        let seen = rx.borrow_and_update().clone();
        assert_eq!(seen.kind, ErrorKind::Error);
        assert!(seen.message.unwrap().contains("check your connection"));

        tracker.handle_search_success();
        assert_eq!(rx.borrow_and_update().kind, ErrorKind::None);
    }
}
