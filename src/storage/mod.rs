//! Storage layer for workflow history.
//!
//! `history` owns the canonical JSON store; `csv` exports it for spreadsheets.

pub mod csv;
pub mod history;

// Re-export key types
pub use self::csv::{CSV_HEADERS, CsvExporter};
pub use history::{HistoryLock, HistoryStore, list_workflow_names, merge};
