//! Search probing subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer
//!     → monitor.rs (issue probe query)
//!     → search::ResilientSearch (retries, circuit gating)
//!     → resilience::SearchErrorTracker state + telemetry
//!     → probe metrics
//! ```
//!
//! # Design Decisions
//! - One tracker per probe loop, disposed when the loop exits
//! - An open circuit skips the probe instead of sending a request

pub mod monitor;

pub use monitor::{ProbeOutcome, SearchProbe};
