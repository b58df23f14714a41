//! Search API access.
//!
//! # Data Flow
//! ```text
//! SearchQuery
//!     → client.rs (normalize, GET /api/v1/search, map failures)
//!     → resilient.rs (report to tracker, retry while allowed)
//!     → SearchResults | SearchError
//! ```

pub mod client;
pub mod error;
pub mod resilient;

pub use client::{SearchClient, SearchQuery, SearchResults};
pub use error::SearchError;
pub use resilient::ResilientSearch;
