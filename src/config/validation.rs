//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values and collects every
//! problem instead of stopping at the first.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::ResilienceConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("search.base_url is not a valid URL: {0}")]
    InvalidBaseUrl(String),

    #[error("search.path must start with '/'")]
    InvalidPath,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retry.backoff_ms must contain at least one delay")]
    EmptyBackoff,

    #[error("observability.metrics_address is not a socket address: {0}")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.search.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidBaseUrl(config.search.base_url.clone())),
    }
    if !config.search.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath);
    }
    if config.search.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("search.request_timeout_secs"));
    }
    if config.search.default_limit == 0 {
        errors.push(ValidationError::Zero("search.default_limit"));
    }

    if config.retry.max_retries == 0 {
        errors.push(ValidationError::Zero("retry.max_retries"));
    }
    if config.retry.backoff_ms.is_empty() {
        errors.push(ValidationError::EmptyBackoff);
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::Zero("circuit_breaker.failure_threshold"));
    }
    if config.circuit_breaker.open_secs == 0 {
        errors.push(ValidationError::Zero("circuit_breaker.open_secs"));
    }

    if config.probe.interval_secs == 0 {
        errors.push(ValidationError::Zero("probe.interval_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
