//! Metrics collection and exposition.
//!
//! # Metrics
//! - `search_resilience_events_total` (counter): tracker events by name
//! - `search_errors_total` (counter): classified errors by kind
//! - `search_circuit_open` (gauge): 1=open, 0=closed
//! - `search_probe_requests_total` (counter): probe outcomes
//! - `search_probe_duration_seconds` (histogram): probe latency
//!
//! All recording goes through the `metrics` facade; without an installed
//! recorder the calls are no-ops.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_search_event(event: &'static str) {
    counter!("search_resilience_events_total", "event" => event).increment(1);
}

pub fn record_search_error(kind: &str) {
    counter!("search_errors_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_circuit_state(open: bool) {
    gauge!("search_circuit_open").set(if open { 1.0 } else { 0.0 });
}

pub fn record_probe(outcome: &'static str, start: Instant) {
    counter!("search_probe_requests_total", "outcome" => outcome).increment(1);
    histogram!("search_probe_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
