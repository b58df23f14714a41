//! Errors surfaced by the search layer.

use crate::resilience::classifier::Classification;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search query: {0}")]
    InvalidQuery(&'static str),

    #[error("invalid search URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("search circuit is open, try again later")]
    CircuitOpen,

    #[error("search failed: {}", message(.0))]
    Failed(Classification),

    #[error("search failed after all retries: {}", message(.0))]
    RetriesExhausted(Classification),

    #[error("search retry was cancelled")]
    Cancelled,
}

fn message(classification: &Classification) -> &str {
    classification.message.as_deref().unwrap_or("unknown error")
}

impl SearchError {
    /// Classification behind a failed search, if there is one.
    pub fn classification(&self) -> Option<&Classification> {
        match self {
            SearchError::Failed(c) | SearchError::RetriesExhausted(c) => Some(c),
            _ => None,
        }
    }
}
