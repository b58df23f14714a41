//! HTTP client for the clip search endpoint.
//!
//! # Responsibilities
//! - Build `GET /api/v1/search` requests with a request ID
//! - Map non-2xx responses and transport errors to `SearchFailure`
//! - Flag 2xx responses served from the backup search path
//!
//! # Design Decisions
//! - The client never retries; that belongs to the tracker
//! - Query parameters are normalized the way the API normalizes them

use std::time::Duration;

use reqwest::header::HeaderValue;
use serde::Serialize;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::resilience::classifier::{is_failover, SearchFailure};
use crate::search::error::SearchError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const MAX_LIMIT: u32 = 100;

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "q")]
    pub query: String,
    pub page: u32,
    pub limit: u32,
    pub sort: String,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            limit: 0,
            sort: String::new(),
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Apply defaults; an empty query is rejected.
    pub fn normalized(&self, default_limit: u32) -> Result<Self, SearchError> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query parameter 'q' is required"));
        }

        Ok(Self {
            query: query.to_string(),
            page: self.page.max(1),
            limit: if (1..=MAX_LIMIT).contains(&self.limit) {
                self.limit
            } else {
                default_limit
            },
            sort: if self.sort.is_empty() {
                "relevance".to_string()
            } else {
                self.sort.clone()
            },
        })
    }
}

/// A successful search response.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub request_id: Uuid,
    pub status: u16,
    pub body: Value,
    /// Set when the backend answered from its backup path.
    pub failover: Option<SearchFailure>,
}

impl SearchResults {
    pub fn is_degraded(&self) -> bool {
        self.failover.is_some()
    }
}

/// Thin reqwest wrapper around the search endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: Url,
    default_limit: u32,
}

impl SearchClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let endpoint = Url::parse(&config.base_url)?.join(&config.path)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            default_limit: config.default_limit,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Run one search request. `query` must already be normalized.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, SearchFailure> {
        let request_id = Uuid::new_v4();
        let request_id_value = HeaderValue::from_str(&request_id.to_string())
            .map_err(|e| SearchFailure::other(e.to_string()))?;

        tracing::debug!(
            request_id = %request_id,
            query = %query.query,
            page = query.page,
            limit = query.limit,
            "Sending search request"
        );

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(query)
            .header(REQUEST_ID_HEADER, request_id_value)
            .send()
            .await
            .map_err(failure_from_reqwest)?;

        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(request_id = %request_id, status = %status, "Search request failed");
            let failure = SearchFailure::from_response(status.as_u16(), headers);
            return Err(if body.is_empty() {
                failure
            } else {
                let detail = format!("{}: {}", failure.detail, body);
                failure.with_detail(detail)
            });
        }

        let failover = is_failover(&headers).then(|| {
            SearchFailure::from_response(status.as_u16(), headers.clone())
                .with_detail("search served from backup path")
        });

        let body = response.json::<Value>().await.map_err(failure_from_reqwest)?;

        Ok(SearchResults {
            request_id,
            status: status.as_u16(),
            body,
            failover,
        })
    }
}

/// Map a transport error onto the failure codes the classifier knows.
pub fn failure_from_reqwest(err: reqwest::Error) -> SearchFailure {
    let code = if err.is_timeout() {
        "ETIMEDOUT"
    } else if err.is_connect() {
        "ECONNREFUSED"
    } else if err.is_request() {
        "ERR_NETWORK"
    } else {
        return SearchFailure::other(err.to_string());
    };
    SearchFailure::network(code).with_detail(err.to_string())
}
