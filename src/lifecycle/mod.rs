//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Ctrl+C (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → probe loop exits, tracker disposed
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
