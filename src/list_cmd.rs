//! CLI command handlers for `list` and `workflows`.

use serde_json::{Value, json};

use crate::HistoryResult;
use crate::config::Config;
use crate::core::WorkflowRecord;
use crate::storage::{HistoryStore, list_workflow_names};

pub const EMPTY_HISTORY_MESSAGE: &str = "No data yet. Run `refresh` to load from the feed.";

/// Envelope for the stored history, optionally narrowed to one workflow.
pub fn render_list(records: &[WorkflowRecord], workflow: Option<&str>) -> Value {
    if records.is_empty() {
        return json!({
            "success": false,
            "message": EMPTY_HISTORY_MESSAGE,
            "data": [],
        });
    }
    let data: Vec<&WorkflowRecord> = records
        .iter()
        .filter(|r| workflow.is_none_or(|name| r.workflow_name == name))
        .collect();
    json!({
        "success": true,
        "data": data,
    })
}

/// Envelope for the distinct workflow names.
pub fn render_workflows(records: &[WorkflowRecord]) -> Value {
    json!({
        "success": !records.is_empty(),
        "workflows": list_workflow_names(records),
    })
}

pub fn list(config: &Config, workflow: Option<&str>) -> HistoryResult<()> {
    let records = HistoryStore::new(&config.history_path).load();
    println!("{}", serde_json::to_string_pretty(&render_list(&records, workflow))?);
    Ok(())
}

pub fn workflows(config: &Config) -> HistoryResult<()> {
    let records = HistoryStore::new(&config.history_path).load();
    println!("{}", serde_json::to_string_pretty(&render_workflows(&records))?);
    Ok(())
}
