//! Search failure classification.
//!
//! # Rules (first match wins)
//! 1. No failure → None
//! 2. `x-search-failover: true` or `x-search-status: degraded` → Failover
//! 3. 503 / 504 → Error (temporarily unavailable)
//! 4. Other 5xx → Error (server error)
//! 5. No response + known network code → Error (connection)
//! 6. Anything else → Error (unexpected)
//!
//! # Design Decisions
//! - Failover wins over status: a degraded 500 is still a failover
//! - Header names and values compare case-insensitively
//! - 4xx responses fall through to the unexpected bucket

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::resilience::state::ErrorKind;

pub const FAILOVER_HEADER: &str = "x-search-failover";
pub const FAILOVER_REASON_HEADER: &str = "x-search-failover-reason";
pub const FAILOVER_SERVICE_HEADER: &str = "x-search-failover-service";
pub const STATUS_HEADER: &str = "x-search-status";

pub const FAILOVER_MESSAGE: &str =
    "Search is using a backup service. Some results may be limited.";
pub const UNAVAILABLE_MESSAGE: &str =
    "Search is temporarily unavailable. Please try again in a moment.";
pub const SERVER_ERROR_MESSAGE: &str = "Search ran into a server error. Please try again.";
pub const NETWORK_MESSAGE: &str = "Unable to reach search. Please check your connection.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred while searching.";

/// Error codes that mean the request never reached the server.
pub const NETWORK_ERROR_CODES: &[&str] = &[
    "ERR_NETWORK",
    "ECONNREFUSED",
    "ECONNRESET",
    "ENOTFOUND",
    "ETIMEDOUT",
    "EAI_AGAIN",
];

/// Response metadata attached to a failed search.
#[derive(Debug, Clone, Default)]
pub struct FailureResponse {
    pub status: u16,
    pub headers: HeaderMap,
}

/// Opaque failure of a search request.
#[derive(Debug, Clone, Default, thiserror::Error)]
#[error("{detail}")]
pub struct SearchFailure {
    pub response: Option<FailureResponse>,
    /// Transport error code, set when no response was received.
    pub code: Option<String>,
    pub detail: String,
}

impl SearchFailure {
    /// Failure carrying an HTTP response.
    pub fn from_response(status: u16, headers: HeaderMap) -> Self {
        Self {
            response: Some(FailureResponse { status, headers }),
            code: None,
            detail: format!("search responded with status {}", status),
        }
    }

    /// Failure with no response, only a transport error code.
    pub fn network(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            response: None,
            detail: format!("search request failed: {}", code),
            code: Some(code),
        }
    }

    /// Failure with neither response nor code.
    pub fn other(detail: impl Into<String>) -> Self {
        Self {
            response: None,
            code: None,
            detail: detail.into(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub message: Option<String>,
    /// Value of `x-search-failover-reason` on failover responses.
    pub failover_reason: Option<String>,
    /// Parsed `Retry-After` seconds, if the server sent one.
    pub retry_after: Option<Duration>,
}

impl Classification {
    fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: Some(message.to_string()),
            failover_reason: None,
            retry_after: None,
        }
    }

    pub fn none() -> Self {
        Self {
            kind: ErrorKind::None,
            message: None,
            failover_reason: None,
            retry_after: None,
        }
    }
}

/// Returns true when the headers announce a degraded/backup search path.
pub fn is_failover(headers: &HeaderMap) -> bool {
    header_eq(headers, FAILOVER_HEADER, "true") || header_eq(headers, STATUS_HEADER, "degraded")
}

fn header_eq(headers: &HeaderMap, name: &str, expected: &str) -> bool {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_str(headers, RETRY_AFTER.as_str())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Classify a failure into a kind and a user-facing message.
pub fn classify(failure: Option<&SearchFailure>) -> Classification {
    let Some(failure) = failure else {
        return Classification::none();
    };

    if let Some(response) = &failure.response {
        let headers = &response.headers;

        if is_failover(headers) {
            let mut c = Classification::new(ErrorKind::Failover, FAILOVER_MESSAGE);
            c.failover_reason = header_str(headers, FAILOVER_REASON_HEADER);
            return c;
        }

        let mut c = match response.status {
            503 | 504 => Classification::new(ErrorKind::Error, UNAVAILABLE_MESSAGE),
            s if s >= 500 => Classification::new(ErrorKind::Error, SERVER_ERROR_MESSAGE),
            _ => Classification::new(ErrorKind::Error, UNEXPECTED_MESSAGE),
        };
        c.retry_after = retry_after(headers);
        return c;
    }

    match failure.code.as_deref() {
        Some(code) if NETWORK_ERROR_CODES.contains(&code) => {
            Classification::new(ErrorKind::Error, NETWORK_MESSAGE)
        }
        _ => Classification::new(ErrorKind::Error, UNEXPECTED_MESSAGE),
    }
}
