//! Mock feed for testing.

use std::sync::Mutex;

use crate::core::RawEvent;
use crate::{HistoryError, HistoryResult};

use super::traits::{EventFeed, FetchWindow};

/// Feed returning a fixed batch of events without any I/O.
///
/// The window of each fetch is remembered so tests can assert on it.
#[derive(Debug, Default)]
pub struct MockFeed {
    events: Vec<RawEvent>,
    fails: bool,
    /// Apply the window's lower bound like a real feed would
    honor_window: bool,
    last_window: Mutex<Option<FetchWindow>>,
}

impl MockFeed {
    /// Create a mock feed that returns `events` verbatim.
    pub fn new(events: Vec<RawEvent>) -> Self {
        MockFeed {
            events,
            ..MockFeed::default()
        }
    }

    /// Create a mock feed with nothing to return.
    pub fn empty() -> Self {
        MockFeed::default()
    }

    /// Make fetch fail.
    pub fn fails(mut self) -> Self {
        self.fails = true;
        self
    }

    /// Drop events older than the requested window.
    pub fn honor_window(mut self) -> Self {
        self.honor_window = true;
        self
    }

    /// Window passed to the most recent fetch, if any.
    pub fn last_window(&self) -> Option<FetchWindow> {
        self.last_window.lock().ok().and_then(|w| w.clone())
    }
}

impl EventFeed for MockFeed {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, window: &FetchWindow) -> HistoryResult<Vec<RawEvent>> {
        if let Ok(mut last) = self.last_window.lock() {
            *last = Some(window.clone());
        }
        if self.fails {
            return Err(HistoryError::Message(
                "mock feed configured to fail".to_string(),
            ));
        }
        Ok(self
            .events
            .iter()
            .filter(|e| !self.honor_window || window.contains(e.timestamp))
            .cloned()
            .collect())
    }
}
