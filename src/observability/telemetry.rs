//! Analytics side channel for search resilience events.
//!
//! # Responsibilities
//! - Name the events the error tracker emits
//! - Define the injectable sink the tracker reports to
//! - Provide sinks backed by tracing and by the metrics facade
//!
//! # Design Decisions
//! - Sinks are injected as `Arc<dyn TelemetrySink>`, never reached through globals
//! - Properties are a JSON object so any analytics backend can consume them
//! - `track` is synchronous and must not call back into the tracker

use std::sync::Arc;

use serde_json::Value;

use crate::observability::metrics;

/// Events emitted by the search error tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryEvent {
    SearchError,
    SearchRetry,
    ErrorDismissed,
    RetryCancelled,
    CircuitBreakerOpened,
}

impl TelemetryEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            TelemetryEvent::SearchError => "search_error",
            TelemetryEvent::SearchRetry => "search_retry",
            TelemetryEvent::ErrorDismissed => "search_error_dismissed",
            TelemetryEvent::RetryCancelled => "search_retry_cancelled",
            TelemetryEvent::CircuitBreakerOpened => "search_circuit_breaker_opened",
        }
    }
}

impl std::fmt::Display for TelemetryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of named events with a property bag.
pub trait TelemetrySink: Send + Sync {
    fn track(&self, event: TelemetryEvent, properties: &Value);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn track(&self, _event: TelemetryEvent, _properties: &Value) {}
}

/// Writes each event as a structured log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn track(&self, event: TelemetryEvent, properties: &Value) {
        match event {
            TelemetryEvent::CircuitBreakerOpened => {
                tracing::warn!(event = %event, properties = %properties, "Search telemetry");
            }
            _ => {
                tracing::info!(event = %event, properties = %properties, "Search telemetry");
            }
        }
    }
}

/// Counts events through the metrics facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl TelemetrySink for MetricsSink {
    fn track(&self, event: TelemetryEvent, properties: &Value) {
        metrics::record_search_event(event.as_str());
        if let Some(kind) = properties.get("error_type").and_then(Value::as_str) {
            if event == TelemetryEvent::SearchError {
                metrics::record_search_error(kind);
            }
        }
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for FanoutSink {
    fn track(&self, event: TelemetryEvent, properties: &Value) {
        for sink in &self.sinks {
            sink.track(event, properties);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(TelemetryEvent, Value)>>);

    impl TelemetrySink for Recording {
        fn track(&self, event: TelemetryEvent, properties: &Value) {
            self.0.lock().unwrap().push((event, properties.clone()));
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(TelemetryEvent::SearchError.as_str(), "search_error");
        assert_eq!(TelemetryEvent::SearchRetry.as_str(), "search_retry");
        assert_eq!(TelemetryEvent::ErrorDismissed.as_str(), "search_error_dismissed");
        assert_eq!(TelemetryEvent::RetryCancelled.as_str(), "search_retry_cancelled");
        assert_eq!(
            TelemetryEvent::CircuitBreakerOpened.as_str(),
            "search_circuit_breaker_opened"
        );
    }

    #[test]
    fn test_fanout_forwards_to_all() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let fanout = FanoutSink::new()
            .with(a.clone())
            .with(Arc::new(NoopSink))
            .with(b.clone());
        assert_eq!(fanout.len(), 3);

        fanout.track(TelemetryEvent::SearchRetry, &json!({ "retry_count": 1 }));

        for sink in [&a, &b] {
            let events = sink.0.lock().unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].0, TelemetryEvent::SearchRetry);
            assert_eq!(events[0].1["retry_count"], 1);
        }
    }

    #[test]
    fn test_metrics_sink_without_recorder() {
        // No recorder installed: the facade must swallow the calls.
        MetricsSink.track(TelemetryEvent::SearchError, &json!({ "error_type": "error" }));
        TracingSink.track(TelemetryEvent::CircuitBreakerOpened, &json!({}));
    }
}
