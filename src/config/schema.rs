//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section has defaults so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::BackoffTable;
use crate::resilience::policy::ResiliencePolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Search API endpoint settings.
    pub search: SearchConfig,

    /// Retry budget and backoff table.
    pub retry: RetryConfig,

    /// Consecutive-failure circuit breaker.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Background probe settings.
    pub probe: ProbeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ResilienceConfig {
    /// Policy handed to each error tracker.
    pub fn policy(&self) -> ResiliencePolicy {
        ResiliencePolicy {
            max_retries: self.retry.max_retries,
            backoff: BackoffTable::from_millis(&self.retry.backoff_ms).unwrap_or_default(),
            failure_threshold: self.circuit_breaker.failure_threshold,
            open_window: Duration::from_secs(self.circuit_breaker.open_secs),
        }
    }
}

/// Search API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the API (e.g., "http://localhost:8080").
    pub base_url: String,

    /// Search endpoint path.
    pub path: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Page size sent when the caller does not pick one.
    pub default_limit: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/api/v1/search".to_string(),
            request_timeout_secs: 10,
            default_limit: 20,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retry attempts before the retry affordance is disabled.
    pub max_retries: u32,

    /// Delay before each attempt in milliseconds; the last entry repeats.
    pub backoff_ms: Vec<u64>,

    /// Retry automatically after a failed search.
    pub automatic: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: vec![1000, 2000, 4000],
            automatic: true,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open.
    pub open_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_secs: 30,
        }
    }
}

/// Probe loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Query issued on every probe.
    pub query: String,

    /// Seconds between probes.
    pub interval_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            query: "clip".to_string(),
            interval_secs: 15,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: ResilienceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ResilienceConfig::default());
        assert_eq!(config.policy(), ResiliencePolicy::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: ResilienceConfig = toml::from_str(
            r#"
            [retry]
            backoff_ms = [10, 20]

            [circuit_breaker]
            open_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.retry.max_retries, 3);
        let policy = config.policy();
        assert_eq!(policy.backoff.delay_for(0), Duration::from_millis(10));
        assert_eq!(policy.backoff.delay_for(7), Duration::from_millis(20));
        assert_eq!(policy.open_window, Duration::from_secs(5));
        assert_eq!(policy.failure_threshold, 5);
    }
}
