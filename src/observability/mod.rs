//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! SearchErrorTracker
//!     → telemetry.rs (named events + property bag, injected sink)
//!         → TracingSink → logging.rs subscriber
//!         → MetricsSink → metrics.rs (Prometheus exporter)
//!
//! SearchProbe
//!     → metrics.rs (probe outcome + latency)
//! ```
//!
//! # Design Decisions
//! - Structured logging with fields, never formatted strings alone
//! - Telemetry sinks are capabilities passed in, not globals
//! - Metrics are cheap and optional (no recorder = no-op)

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use telemetry::{FanoutSink, MetricsSink, NoopSink, TelemetryEvent, TelemetrySink, TracingSink};
