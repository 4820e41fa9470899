//! Core types for nightly-history.
//!
//! This module contains the `WorkflowRecord` schema persisted by the history store
//! and the `RawEvent` shape consumed by the parser.

pub mod schema;

// Re-export key types for convenience
pub use schema::{RawEvent, RecordKey, RecordStatus, TOTAL_NIGHTLY_PROCESS, WorkflowRecord};
