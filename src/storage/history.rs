//! JSON history store for workflow records.
//!
//! The history file is a single JSON array rewritten wholesale on every save.
//! It outlives the feed's retention window, so older files written by earlier
//! tools are accepted on load and normalized into the current schema.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use tracing::{debug, info, warn};

use crate::core::{RecordKey, RecordStatus, WorkflowRecord};
use crate::{HistoryError, HistoryResult};

/// Record as found on disk, before normalization.
///
/// Every field beyond the name and date is optional so files from older
/// writers (no status, null error messages, timestamps in `date`) still load.
#[derive(Debug, Deserialize)]
struct StoredRecord {
    workflow_name: String,
    date: String,
    #[serde(default)]
    duration_seconds: Option<f64>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    status: Option<RecordStatus>,
    #[serde(default)]
    error_message: Option<String>,
}

fn parse_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    let spaced = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    let t_separated = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(raw, spaced)
        .or_else(|_| PrimitiveDateTime::parse(raw, t_separated))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

impl StoredRecord {
    fn normalize(self) -> Option<WorkflowRecord> {
        let Some(date) = parse_date(&self.date) else {
            warn!(
                workflow = %self.workflow_name,
                date = %self.date,
                "dropping stored record with unreadable date"
            );
            return None;
        };

        let timestamp = match self.timestamp.as_deref().and_then(parse_timestamp) {
            Some(at) => at,
            None => {
                warn!(
                    workflow = %self.workflow_name,
                    timestamp = ?self.timestamp,
                    "stored record has unreadable timestamp, using midnight of its date"
                );
                PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc()
            }
        };

        let status = self.status.unwrap_or_default();
        let mut error_message = self.error_message.unwrap_or_default();
        if status == RecordStatus::Error && error_message.trim().is_empty() {
            error_message = "Failure".to_string();
        }
        if status == RecordStatus::Success {
            error_message.clear();
        }

        Some(WorkflowRecord {
            workflow_name: self.workflow_name,
            date,
            duration_seconds: self.duration_seconds.unwrap_or(0.0).max(0.0),
            timestamp,
            status,
            error_message,
        })
    }
}

/// Keep the last record per key, ordered by `(date, workflow_name)`.
fn dedup_last_wins<'a>(records: impl Iterator<Item = &'a WorkflowRecord>) -> Vec<WorkflowRecord> {
    let mut slots: BTreeMap<RecordKey, &WorkflowRecord> = BTreeMap::new();
    for record in records {
        slots.insert(record.key(), record);
    }
    slots.into_values().cloned().collect()
}

/// Merge freshly parsed records into existing history.
///
/// `incoming` wins over `existing` on a key collision, and within `incoming`
/// a later record wins over an earlier one. The result is a new set sorted by
/// `(date, workflow_name)`, so merging the same `incoming` twice is a no-op.
pub fn merge(existing: &[WorkflowRecord], incoming: &[WorkflowRecord]) -> Vec<WorkflowRecord> {
    dedup_last_wins(existing.iter().chain(incoming.iter()))
}

/// Distinct workflow names, sorted.
pub fn list_workflow_names(records: &[WorkflowRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|r| r.workflow_name.clone()).collect();
    names.sort();
    names.dedup();
    names
}

/// Exclusive advisory lock on the history file, released on drop.
#[derive(Debug)]
pub struct HistoryLock {
    file: File,
    path: PathBuf,
}

impl HistoryLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Persistent, deduplicated history of workflow records.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        HistoryStore {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored history.
    ///
    /// A missing, empty or unreadable file is a first run and yields an empty
    /// set. Individual records that cannot be normalized are skipped.
    pub fn load(&self) -> Vec<WorkflowRecord> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history file yet");
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to read history, starting empty"
                );
                return Vec::new();
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Vec::new();
        }

        let values: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "history is not a JSON array, starting empty"
                );
                return Vec::new();
            }
        };

        let total = values.len();
        let records: Vec<WorkflowRecord> = values
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value::<StoredRecord>(value) {
                Ok(stored) => stored.normalize(),
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping malformed history record");
                    None
                }
            })
            .collect();

        let records = dedup_last_wins(records.iter());
        debug!(
            path = %self.path.display(),
            stored = total,
            loaded = records.len(),
            "loaded history"
        );
        records
    }

    /// Replace the stored history with `records`.
    ///
    /// Writes to a temporary file next to the target and renames it into
    /// place, so readers never observe a half-written history.
    pub fn save(&self, records: &[WorkflowRecord]) -> HistoryResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                HistoryError::Message(format!("failed to create directory {}: {e}", dir.display()))
            })?;
        }

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
            HistoryError::Message(format!("failed to create temp file in {}: {e}", dir.display()))
        })?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, records)
                .map_err(|e| HistoryError::Message(format!("failed to serialize history: {e}")))?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            HistoryError::Message(format!(
                "failed to replace {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        info!(path = %self.path.display(), records = records.len(), "saved history");
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("history"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Block until this process holds the single-writer lock.
    pub fn lock(&self) -> HistoryResult<HistoryLock> {
        let path = self.lock_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                HistoryError::Message(format!("failed to open lock {}: {e}", path.display()))
            })?;
        FileExt::lock_exclusive(&file).map_err(|e| {
            HistoryError::Message(format!("failed to acquire lock {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), "acquired history lock");
        Ok(HistoryLock { file, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn record(name: &str, day: Date, seconds: f64) -> WorkflowRecord {
        WorkflowRecord::success(name, day, seconds, datetime!(2024-01-15 02:00:00 UTC))
    }

    #[test]
    fn test_parse_date_strips_time_of_day() {
        assert_eq!(parse_date("2024-01-15T00:00:00.000"), Some(date!(2024 - 01 - 15)));
        assert_eq!(parse_date("2024-01-15"), Some(date!(2024 - 01 - 15)));
        assert_eq!(parse_date("15/01/2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = datetime!(2024-01-15 02:10:00.5 UTC);
        assert_eq!(parse_timestamp("2024-01-15T02:10:00.5Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 02:10:00.500000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T02:10:00.500"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-15 02:10:00"),
            Some(datetime!(2024-01-15 02:10:00 UTC))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_error_without_message_gets_placeholder() {
        let stored: StoredRecord = serde_json::from_str(
            r#"{"workflow_name": "Load", "date": "2024-01-15", "status": "error", "error_message": null}"#,
        )
        .unwrap();
        let record = stored.normalize().unwrap();
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_message, "Failure");
        assert_eq!(record.timestamp, datetime!(2024-01-15 00:00:00 UTC));
    }

    #[test]
    fn test_merge_incoming_wins() {
        let day = date!(2024 - 01 - 15);
        let existing = vec![record("Build", day, 10.0)];
        let incoming = vec![record("Build", day, 20.0)];
        let merged = merge(&existing, &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].duration_seconds, 20.0);
    }

    #[test]
    fn test_merge_later_incoming_wins_within_batch() {
        let day = date!(2024 - 01 - 15);
        let incoming = vec![record("Build", day, 1.0), record("Build", day, 2.0)];
        let merged = merge(&[], &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].duration_seconds, 2.0);
    }

    #[test]
    fn test_merge_sorts_by_date_then_name() {
        let merged = merge(
            &[record("b", date!(2024 - 01 - 16), 1.0)],
            &[
                record("z", date!(2024 - 01 - 15), 1.0),
                record("a", date!(2024 - 01 - 16), 1.0),
            ],
        );
        let order: Vec<(String, Date)> = merged
            .iter()
            .map(|r| (r.workflow_name.clone(), r.date))
            .collect();
        assert_eq!(
            order,
            vec![
                ("z".to_string(), date!(2024 - 01 - 15)),
                ("a".to_string(), date!(2024 - 01 - 16)),
                ("b".to_string(), date!(2024 - 01 - 16)),
            ]
        );
    }

    #[test]
    fn test_list_workflow_names_distinct_sorted() {
        let day = date!(2024 - 01 - 15);
        let records = vec![
            record("Load", day, 1.0),
            record("Build", day, 1.0),
            record("Load", date!(2024 - 01 - 16), 1.0),
        ];
        assert_eq!(list_workflow_names(&records), vec!["Build", "Load"]);
    }

    #[test]
    fn test_lock_path_is_sibling() {
        let store = HistoryStore::new("/var/lib/nightly/workflow_history.json");
        assert_eq!(
            store.lock_path(),
            PathBuf::from("/var/lib/nightly/workflow_history.json.lock")
        );
    }
}
