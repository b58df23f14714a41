//! Tunables shared by every tracker built from one config.

use std::time::Duration;

use crate::resilience::backoff::BackoffTable;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_OPEN_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResiliencePolicy {
    pub max_retries: u32,
    pub backoff: BackoffTable,
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before closing on its own.
    pub open_window: Duration,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffTable::default(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            open_window: DEFAULT_OPEN_WINDOW,
        }
    }
}
