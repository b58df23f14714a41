//! Client-side resilience for the clip search API.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                      search-resilience                        │
//!   │                                                               │
//!   │  SearchQuery ─▶ search::client ─▶ GET /api/v1/search ─────────┼──▶ Search API
//!   │                     │                                         │
//!   │                     ▼                                         │
//!   │              search::resilient ── retry loop, circuit gate    │
//!   │                     │                                         │
//!   │                     ▼                                         │
//!   │          resilience::SearchErrorTracker                       │
//!   │      classifier · backoff · timer · circuit_breaker           │
//!   │            │                          │                       │
//!   │            ▼                          ▼                       │
//!   │   watch::Receiver<ErrorState>   observability::telemetry      │
//!   │                                                               │
//!   │  config (TOML) · lifecycle (shutdown) · probe (periodic run)  │
//!   └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod probe;
pub mod resilience;
pub mod search;

pub use config::ResilienceConfig;
pub use lifecycle::Shutdown;
pub use resilience::{ErrorKind, ErrorState, SearchErrorTracker, SearchFailure};
pub use search::{ResilientSearch, SearchClient, SearchQuery};
