//! Refresh workflow: fetch → parse → load → merge → save.
//!
//! Every failure inside a refresh is absorbed here and reported through
//! `RefreshOutcome { success, message }`; nothing propagates to the caller.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::HistoryResult;
use crate::config::Config;
use crate::core::WorkflowRecord;
use crate::feed::{EventFeed, FetchWindow};
use crate::parse::EventParser;
use crate::storage::{HistoryStore, list_workflow_names, merge};

pub const NO_DATA_MESSAGE: &str = "No workflow data found";

/// Result of one refresh, shaped for the consumer API.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
    /// Records parsed from this fetch
    pub new_count: usize,
    /// Records in the history after the merge
    pub total_count: usize,
    #[serde(rename = "data")]
    pub records: Vec<WorkflowRecord>,
}

impl RefreshOutcome {
    fn failed(message: impl Into<String>, records: Vec<WorkflowRecord>) -> Self {
        RefreshOutcome {
            success: false,
            message: message.into(),
            new_count: 0,
            total_count: records.len(),
            records,
        }
    }
}

/// Composes a feed, the event parser and the history store.
///
/// Refreshes hold the store's advisory lock from load to save, so two
/// orchestrators pointed at the same file take turns instead of racing.
pub struct RefreshOrchestrator<'a> {
    config: Config,
    feed: &'a dyn EventFeed,
    parser: EventParser,
    store: HistoryStore,
}

impl<'a> RefreshOrchestrator<'a> {
    pub fn new(config: Config, feed: &'a dyn EventFeed) -> HistoryResult<Self> {
        let parser = EventParser::new(config.parser_options()?);
        let store = HistoryStore::new(&config.history_path);
        Ok(RefreshOrchestrator {
            config,
            feed,
            parser,
            store,
        })
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn refresh(&self) -> RefreshOutcome {
        self.refresh_at(OffsetDateTime::now_utc())
    }

    /// Run a refresh with the lookback window ending at `now`.
    pub fn refresh_at(&self, now: OffsetDateTime) -> RefreshOutcome {
        let _lock = match self.store.lock() {
            Ok(lock) => lock,
            Err(e) => {
                error!(error = %e, "could not lock history");
                return RefreshOutcome::failed(e.to_string(), Vec::new());
            }
        };

        // Step 1: pull raw events; a failed fetch degrades to "nothing new"
        let window = FetchWindow::lookback(&self.config.channel, self.config.lookback_days, now);
        info!(
            feed = self.feed.name(),
            channel = %window.channel,
            lookback_days = self.config.lookback_days,
            "fetching events"
        );
        let events = match self.feed.fetch(&window) {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "feed fetch failed, using stored history only");
                Vec::new()
            }
        };
        info!(events = events.len(), "fetched events");

        // Step 2: parse and fold into the stored history
        let parsed = self.parser.parse(events);
        let history = self.store.load();

        if parsed.is_empty() && history.is_empty() {
            info!("no parsed records and no stored history");
            return RefreshOutcome::failed(NO_DATA_MESSAGE, Vec::new());
        }

        let merged = merge(&history, &parsed);

        // Step 3: persist the whole set
        if let Err(e) = self.store.save(&merged) {
            error!(error = %e, "failed to save history");
            return RefreshOutcome::failed(format!("Failed to save history: {e}"), history);
        }

        let new_count = parsed.len();
        let total_count = merged.len();
        info!(new_count, total_count, "refresh complete");
        RefreshOutcome {
            success: true,
            message: format!(
                "Fetched {new_count} records from feed. Total history: {total_count} records."
            ),
            new_count,
            total_count,
            records: merged,
        }
    }

    /// Every stored record, sorted by `(date, workflow_name)`.
    pub fn list_all(&self) -> Vec<WorkflowRecord> {
        self.store.load()
    }

    /// Distinct stored workflow names, sorted.
    pub fn list_workflow_names(&self) -> Vec<String> {
        list_workflow_names(&self.store.load())
    }
}
