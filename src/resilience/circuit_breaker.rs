//! Client-side circuit breaker for the search backend.
//!
//! # States
//! - Closed: retries and requests flow normally
//! - Open: consecutive failures hit the threshold; automatic retries stop
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= threshold
//! Open → Closed: fixed window elapsed (success does not close early)
//! ```
//!
//! # Design Decisions
//! - Counter resets on any success, so only uninterrupted failure runs trip
//! - The close timer is a spawned task owned here and aborted on drop
//! - No half-open probe; the window simply expires

use std::time::Duration;

use tokio::task::JoinHandle;

/// Consecutive-failure tracking and the auto-close timer.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    open_for: Duration,
    consecutive_failures: u32,
    close_task: Option<JoinHandle<()>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, open_for: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            open_for,
            consecutive_failures: 0,
            close_task: None,
        }
    }

    /// Count a failure. Returns true once the threshold is reached.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures >= self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn open_for(&self) -> Duration {
        self.open_for
    }

    /// Take ownership of the task that will close the circuit.
    pub fn schedule_close(&mut self, task: JoinHandle<()>) {
        if let Some(previous) = self.close_task.replace(task) {
            previous.abort();
        }
    }

    /// Forget the close task once it has run.
    pub fn close_fired(&mut self) {
        self.close_task = None;
    }

    pub fn abort_close(&mut self) {
        if let Some(task) = self.close_task.take() {
            task.abort();
        }
    }
}

impl Drop for CircuitBreaker {
    fn drop(&mut self) {
        self.abort_close();
    }
}
