//! WorkflowRecord schema - one parsed step outcome (or session total) per record.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Reserved workflow name for the span of a whole nightly session.
pub const TOTAL_NIGHTLY_PROCESS: &str = "TOTAL_NIGHTLY_PROCESS";

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Outcome of a workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Success,
    Error,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Success => "success",
            RecordStatus::Error => "error",
        }
    }
}

/// One item from the raw notification feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub text: String,
    pub timestamp: OffsetDateTime,
}

impl RawEvent {
    pub fn new(text: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        RawEvent {
            text: text.into(),
            timestamp,
        }
    }
}

/// Deduplication slot of a record.
///
/// Identity is `(workflow_name, date)`; field order makes the derived `Ord`
/// sort by date first, which is the order the history is kept in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub date: Date,
    pub workflow_name: String,
}

/// A single execution record as stored in the history file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Step name, or `TOTAL_NIGHTLY_PROCESS` for the session span
    pub workflow_name: String,

    /// Calendar date of the session the step ran in
    #[serde(with = "iso_date")]
    pub date: Date,

    /// Elapsed seconds, never negative
    pub duration_seconds: f64,

    /// Instant of the notification that produced this record
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,

    pub status: RecordStatus,

    /// Empty for successful records
    #[serde(default)]
    pub error_message: String,
}

impl WorkflowRecord {
    pub fn success(
        workflow_name: impl Into<String>,
        date: Date,
        duration_seconds: f64,
        timestamp: OffsetDateTime,
    ) -> Self {
        WorkflowRecord {
            workflow_name: workflow_name.into(),
            date,
            duration_seconds: duration_seconds.max(0.0),
            timestamp,
            status: RecordStatus::Success,
            error_message: String::new(),
        }
    }

    pub fn failure(
        workflow_name: impl Into<String>,
        date: Date,
        duration_seconds: f64,
        timestamp: OffsetDateTime,
        error_message: impl Into<String>,
    ) -> Self {
        WorkflowRecord {
            workflow_name: workflow_name.into(),
            date,
            duration_seconds: duration_seconds.max(0.0),
            timestamp,
            status: RecordStatus::Error,
            error_message: error_message.into(),
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date,
            workflow_name: self.workflow_name.clone(),
        }
    }

    pub fn is_total(&self) -> bool {
        self.workflow_name == TOTAL_NIGHTLY_PROCESS
    }

    /// `YYYY-MM-DD` form of `date`
    pub fn date_string(&self) -> String {
        format_date(self.date)
    }

    /// RFC 3339 form of `timestamp`
    pub fn timestamp_string(&self) -> String {
        self.timestamp
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default()
    }
}

pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn test_record_serializes_store_fields() {
        let record = WorkflowRecord::failure(
            "Load",
            date!(2024 - 01 - 15),
            12.5,
            datetime!(2024-01-15 02:10:00 UTC),
            "disk full",
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["workflow_name"], "Load");
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["duration_seconds"], 12.5);
        assert_eq!(json["timestamp"], "2024-01-15T02:10:00Z");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_message"], "disk full");
    }

    #[test]
    fn test_success_has_empty_error_message() {
        let record = WorkflowRecord::success(
            "Build",
            date!(2024 - 01 - 15),
            120.0,
            datetime!(2024-01-15 02:05:00 UTC),
        );
        assert_eq!(record.status, RecordStatus::Success);
        assert!(record.error_message.is_empty());
    }

    #[test]
    fn test_negative_duration_is_clamped() {
        let record = WorkflowRecord::success(
            "Build",
            date!(2024 - 01 - 15),
            -3.0,
            datetime!(2024-01-15 02:05:00 UTC),
        );
        assert_eq!(record.duration_seconds, 0.0);
    }

    #[test]
    fn test_key_orders_by_date_then_name() {
        let early_b = RecordKey {
            date: date!(2024 - 01 - 14),
            workflow_name: "b".to_string(),
        };
        let late_a = RecordKey {
            date: date!(2024 - 01 - 15),
            workflow_name: "a".to_string(),
        };
        assert!(early_b < late_a);
    }

    #[test]
    fn test_format_date_pads_fields() {
        assert_eq!(format_date(date!(2024 - 03 - 05)), "2024-03-05");
    }
}
