//! Feed trait and the fetch window it is queried with.

use time::{Duration, OffsetDateTime, PrimitiveDateTime};

use crate::HistoryResult;
use crate::core::RawEvent;

/// Channel and lower time bound for one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchWindow {
    pub channel: String,
    /// Events older than this instant are not returned
    pub oldest: OffsetDateTime,
}

impl FetchWindow {
    /// Window covering the last `days` days before `now`.
    ///
    /// A lookback reaching past the earliest representable instant covers
    /// everything.
    pub fn lookback(channel: impl Into<String>, days: u32, now: OffsetDateTime) -> Self {
        let oldest = now
            .checked_sub(Duration::days(i64::from(days)))
            .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_utc());
        FetchWindow {
            channel: channel.into(),
            oldest,
        }
    }

    pub fn contains(&self, at: OffsetDateTime) -> bool {
        at >= self.oldest
    }
}

/// Source of raw notification events.
///
/// Implementations return events in arrival order; they need not be sorted.
/// Transport problems are reported as errors and absorbed by the caller.
pub trait EventFeed: Send + Sync {
    /// Short name used in logs (e.g., "file", "mock").
    fn name(&self) -> &str;

    /// Fetch every event of `window.channel` not older than `window.oldest`,
    /// following pagination until the source reports no more pages.
    fn fetch(&self, window: &FetchWindow) -> HistoryResult<Vec<RawEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_lookback_window() {
        let window = FetchWindow::lookback("ops", 90, datetime!(2024-04-01 00:00:00 UTC));
        assert_eq!(window.channel, "ops");
        assert_eq!(window.oldest, datetime!(2024-01-02 00:00:00 UTC));
        assert!(window.contains(datetime!(2024-01-02 00:00:00 UTC)));
        assert!(!window.contains(datetime!(2024-01-01 23:59:59 UTC)));
    }

    #[test]
    fn test_huge_lookback_saturates() {
        let window = FetchWindow::lookback("ops", u32::MAX, datetime!(2024-01-20 00:00:00 UTC));
        assert_eq!(window.oldest, PrimitiveDateTime::MIN.assume_utc());
        assert!(window.contains(datetime!(1970-01-01 00:00:00 UTC)));
    }
}
