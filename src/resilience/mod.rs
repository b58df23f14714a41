//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Search failure:
//!     → classifier.rs (failover / error / none + message)
//!     → tracker.rs (update ErrorState, emit telemetry)
//!     → circuit_breaker.rs (count consecutive failures, open on threshold)
//!
//! Retry:
//!     → backoff.rs (delay from the fixed table)
//!     → timer.rs (single cancellable wait)
//!     → caller's search function → success / failure handler
//! ```
//!
//! # Design Decisions
//! - Failures become state, never errors returned to the presenter
//! - One retry timer per tracker; arming a new one cancels the old
//! - Circuit open/close is orthogonal to the error kind

pub mod backoff;
pub mod circuit_breaker;
pub mod classifier;
pub mod policy;
pub mod state;
pub mod timer;
pub mod tracker;

pub use classifier::{classify, Classification, SearchFailure};
pub use policy::ResiliencePolicy;
pub use state::{ErrorKind, ErrorState};
pub use tracker::{RetryOutcome, SearchErrorTracker};
