//! Periodic search probing.
//!
//! # Responsibilities
//! - Issue the configured probe query on a fixed interval
//! - Feed every outcome through the resilient search (and so the tracker)
//! - Record probe metrics and stop on the shutdown signal

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::config::ProbeConfig;
use crate::observability::metrics;
use crate::search::{ResilientSearch, SearchError, SearchQuery};

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Degraded,
    Failed,
    CircuitOpen,
    Cancelled,
}

impl ProbeOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            ProbeOutcome::Healthy => "healthy",
            ProbeOutcome::Degraded => "degraded",
            ProbeOutcome::Failed => "failed",
            ProbeOutcome::CircuitOpen => "circuit_open",
            ProbeOutcome::Cancelled => "cancelled",
        }
    }
}

pub struct SearchProbe {
    search: ResilientSearch,
    config: ProbeConfig,
}

impl SearchProbe {
    pub fn new(search: ResilientSearch, config: ProbeConfig) -> Self {
        Self { search, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            query = %self.config.query,
            endpoint = %self.search.client().endpoint(),
            "Search probe starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = async {
                    ticker.tick().await;
                    self.probe_once().await
                } => {}
                _ = shutdown.recv() => {
                    tracing::info!("Search probe received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        self.search.tracker().dispose();
    }

    /// Run the probe query once.
    pub async fn probe_once(&self) -> ProbeOutcome {
        let start = Instant::now();
        let query = SearchQuery::new(self.config.query.clone());

        let outcome = match self.search.search(&query).await {
            Ok(results) if results.is_degraded() => {
                tracing::warn!(request_id = %results.request_id, "Search probe served by backup path");
                ProbeOutcome::Degraded
            }
            Ok(results) => {
                tracing::debug!(request_id = %results.request_id, "Search probe succeeded");
                ProbeOutcome::Healthy
            }
            Err(SearchError::CircuitOpen) => {
                tracing::warn!("Search probe skipped, circuit open");
                ProbeOutcome::CircuitOpen
            }
            Err(SearchError::Cancelled) => ProbeOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(error = %e, "Search probe failed");
                ProbeOutcome::Failed
            }
        };

        metrics::record_probe(outcome.as_str(), start);
        outcome
    }
}
