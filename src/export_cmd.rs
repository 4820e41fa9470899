//! CLI command handler for `export`.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::HistoryResult;
use crate::config::Config;
use crate::storage::{CsvExporter, HistoryStore};

/// Export the stored history as CSV to `output`, or to stdout when `None`.
pub fn run(config: &Config, output: Option<PathBuf>) -> HistoryResult<usize> {
    let records = HistoryStore::new(&config.history_path).load();
    let exporter = CsvExporter::new();
    match output {
        Some(path) => {
            exporter
                .export(&records, &path)
                .with_context(|| format!("exporting history to {}", path.display()))?;
            info!(path = %path.display(), records = records.len(), "exported history");
        }
        None => exporter.export_to_stdout(&records)?,
    }
    Ok(records.len())
}
