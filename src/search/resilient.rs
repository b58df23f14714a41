//! Search with automatic retries behind the error tracker.

use crate::resilience::state::ErrorKind;
use crate::resilience::tracker::{RetryOutcome, SearchErrorTracker};
use crate::search::client::{SearchClient, SearchQuery, SearchResults};
use crate::search::error::SearchError;

/// A search client paired with the tracker that owns its error state.
#[derive(Debug, Clone)]
pub struct ResilientSearch {
    client: SearchClient,
    tracker: SearchErrorTracker,
    automatic_retry: bool,
}

impl ResilientSearch {
    pub fn new(client: SearchClient, tracker: SearchErrorTracker, automatic_retry: bool) -> Self {
        Self {
            client,
            tracker,
            automatic_retry,
        }
    }

    pub fn tracker(&self) -> &SearchErrorTracker {
        &self.tracker
    }

    pub fn client(&self) -> &SearchClient {
        &self.client
    }

    /// Search once, then keep retrying while the tracker allows it.
    ///
    /// Degraded results are returned as `Ok` and reported to the tracker as
    /// a success followed by the failover, so a run of them never grows the
    /// failure count past one. Only an open circuit caused by errors skips
    /// the request.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, SearchError> {
        let query = query.normalized(self.client.default_limit())?;

        let state = self.tracker.state();
        if state.is_circuit_open && state.kind != ErrorKind::Failover {
            tracing::debug!(query = %query.query, "Search skipped, circuit open");
            return Err(SearchError::CircuitOpen);
        }

        let mut last = match self.client.search(&query).await {
            Ok(results) => {
                self.record_results(&results, false);
                return Ok(results);
            }
            Err(failure) => self.tracker.handle_search_error(&failure),
        };

        if !self.automatic_retry {
            return Err(SearchError::Failed(last));
        }

        loop {
            let state = self.tracker.state();
            if state.is_circuit_open {
                return Err(SearchError::CircuitOpen);
            }
            if state.retry_count >= state.max_retries {
                return Err(SearchError::RetriesExhausted(last));
            }

            let client = &self.client;
            let q = &query;
            match self.tracker.retry(|| client.search(q)).await {
                RetryOutcome::Succeeded(results) => {
                    self.record_results(&results, true);
                    return Ok(results);
                }
                RetryOutcome::Failed(classification) => last = classification,
                RetryOutcome::Exhausted => return Err(SearchError::RetriesExhausted(last)),
                RetryOutcome::Cancelled => return Err(SearchError::Cancelled),
            }
        }
    }

    fn record_results(&self, results: &SearchResults, success_recorded: bool) {
        if !success_recorded {
            self.tracker.handle_search_success();
        }
        if let Some(failover) = &results.failover {
            self.tracker.handle_search_error(failover);
        }
    }
}
