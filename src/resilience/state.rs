//! Observable search error state.
//!
//! # States
//! - None: no active error
//! - Failover: backend answered from its backup path, results may be partial
//! - Error: search unusable (network failure, 5xx, unknown)
//!
//! # State Transitions
//! ```text
//! None → Failover | Error: classified failure
//! Failover | Error → None: success or dismiss
//! ```
//!
//! `is_retrying` and `is_circuit_open` are orthogonal flags and do not
//! depend on `kind`.

use serde::{Deserialize, Serialize};

/// Kind of the currently surfaced search problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[default]
    None,
    Failover,
    Error,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::None => "none",
            ErrorKind::Failover => "failover",
            ErrorKind::Error => "error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a tracker's state, as rendered by presenters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorState {
    pub kind: ErrorKind,
    pub message: Option<String>,
    /// Attempts made since the last success or reset.
    pub retry_count: u32,
    pub max_retries: u32,
    pub is_retrying: bool,
    pub is_circuit_open: bool,
}

impl ErrorState {
    /// Fresh state for a tracker allowing `max_retries` attempts.
    pub fn new(max_retries: u32) -> Self {
        Self {
            kind: ErrorKind::None,
            message: None,
            retry_count: 0,
            max_retries,
            is_retrying: false,
            is_circuit_open: false,
        }
    }

    /// Whether a retry affordance should be offered.
    pub fn can_retry(&self) -> bool {
        !self.is_circuit_open && self.retry_count < self.max_retries
    }

    pub fn has_error(&self) -> bool {
        self.kind != ErrorKind::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = ErrorState::new(3);
        assert_eq!(state.kind, ErrorKind::None);
        assert_eq!(state.retry_count, 0);
        assert!(!state.is_retrying);
        assert!(!state.is_circuit_open);
        assert!(state.can_retry());
        assert!(!state.has_error());
    }

    #[test]
    fn test_retry_affordance() {
        let mut state = ErrorState::new(3);
        state.retry_count = 3;
        assert!(!state.can_retry());

        state.retry_count = 1;
        state.is_circuit_open = true;
        assert!(!state.can_retry());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::Failover).unwrap();
        assert_eq!(json, "\"failover\"");
        assert_eq!(ErrorKind::Error.to_string(), "error");
    }
}
