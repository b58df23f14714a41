//! Fixed-table exponential backoff.

use std::time::Duration;

/// Delays applied before each retry attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffTable {
    delays: Vec<Duration>,
}

impl BackoffTable {
    /// Build a table from explicit millisecond delays.
    ///
    /// Returns `None` for an empty table.
    pub fn from_millis(delays_ms: &[u64]) -> Option<Self> {
        if delays_ms.is_empty() {
            return None;
        }
        Some(Self {
            delays: delays_ms.iter().copied().map(Duration::from_millis).collect(),
        })
    }

    /// Doubling table: `base, 2*base, 4*base, ...` with `len` entries.
    pub fn exponential(base_ms: u64, len: u32) -> Self {
        let delays = (0..len.max(1))
            .map(|i| Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(i))))
            .collect();
        Self { delays }
    }

    /// Delay for the attempt made after `prior_attempts` retries.
    ///
    /// Indices past the end clamp to the last entry.
    pub fn delay_for(&self, prior_attempts: u32) -> Duration {
        let idx = (prior_attempts as usize).min(self.delays.len() - 1);
        self.delays[idx]
    }
}

impl Default for BackoffTable {
    /// 1s, 2s, 4s.
    fn default() -> Self {
        Self::exponential(1000, 3)
    }
}
