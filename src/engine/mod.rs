//! Engine module: composes the feed, parser and history store.
//!
//! # Boundaries
//!
//! - `EventFeed` only knows how to fetch raw events for a window.
//! - `EventParser` only turns events into records; it never touches storage.
//! - `HistoryStore` only loads, merges and saves records.
//!
//! The `refresh` submodule runs them in order and turns every failure into a
//! reportable `RefreshOutcome`.

pub mod refresh;

// Re-export key types for convenience
pub use refresh::{NO_DATA_MESSAGE, RefreshOrchestrator, RefreshOutcome};
