//! File-backed feed over exported channel-history pages.
//!
//! A channel export is a chain of JSON pages in one directory:
//! `<channel>.json` is the first page and each page may point at the next one
//! through `response_metadata.next_cursor`, stored as `<channel>.<cursor>.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::core::RawEvent;
use crate::{HistoryError, HistoryResult};

use super::traits::{EventFeed, FetchWindow};

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    messages: Vec<PageMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct PageMessage {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

impl HistoryPage {
    fn next_cursor(&self) -> Option<&str> {
        if !self.has_more {
            return None;
        }
        self.response_metadata
            .as_ref()
            .and_then(|m| m.next_cursor.as_deref())
            .filter(|c| !c.is_empty())
    }
}

/// Parse a `"<seconds>.<fraction>"` timestamp into an instant.
///
/// Up to nine fractional digits are kept; extra digits are truncated.
pub fn parse_ts(ts: &str) -> Option<OffsetDateTime> {
    let (secs, frac) = ts.trim().split_once('.').unwrap_or((ts.trim(), ""));
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: String = frac.chars().take(9).collect();
    let nanos: i128 = if digits.is_empty() {
        0
    } else {
        let scale = 10i128.pow(9 - digits.len() as u32);
        digits.parse::<i128>().ok()? * scale
    };
    let total = i128::from(secs) * 1_000_000_000 + if secs < 0 { -nanos } else { nanos };
    OffsetDateTime::from_unix_timestamp_nanos(total).ok()
}

/// Feed reading channel-history pages from a directory.
#[derive(Debug, Clone)]
pub struct FileFeed {
    dir: PathBuf,
}

impl FileFeed {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        FileFeed {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn page_path(&self, channel: &str, cursor: Option<&str>) -> PathBuf {
        match cursor {
            Some(cursor) => self.dir.join(format!("{channel}.{cursor}.json")),
            None => self.dir.join(format!("{channel}.json")),
        }
    }

    fn read_page(&self, path: &Path) -> HistoryResult<HistoryPage> {
        let bytes = std::fs::read(path).map_err(|e| {
            HistoryError::Message(format!("failed to read page {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            HistoryError::Message(format!("failed to parse page {}: {e}", path.display()))
        })
    }
}

fn validate_name(kind: &str, value: &str) -> HistoryResult<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
        return Err(HistoryError::Message(format!("invalid {kind}: {value:?}")));
    }
    Ok(())
}

impl EventFeed for FileFeed {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch(&self, window: &FetchWindow) -> HistoryResult<Vec<RawEvent>> {
        validate_name("channel", &window.channel)?;

        let first = self.page_path(&window.channel, None);
        if !first.exists() {
            return Err(HistoryError::Message(format!(
                "could not find channel: {} (no {})",
                window.channel,
                first.display()
            )));
        }

        let mut events = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut path = first;
        let mut pages = 0usize;

        loop {
            let page = self.read_page(&path)?;
            pages += 1;

            for message in &page.messages {
                let Some(at) = message.ts.as_deref().and_then(parse_ts) else {
                    debug!(page = %path.display(), "skipping message without usable ts");
                    continue;
                };
                if !window.contains(at) {
                    continue;
                }
                events.push(RawEvent::new(message.text.clone().unwrap_or_default(), at));
            }

            let Some(cursor) = page.next_cursor() else {
                break;
            };
            validate_name("cursor", cursor)?;
            if !seen_cursors.insert(cursor.to_string()) {
                warn!(cursor, "pagination cursor repeated, stopping");
                break;
            }
            path = self.page_path(&window.channel, Some(cursor));
        }

        debug!(
            channel = %window.channel,
            pages,
            events = events.len(),
            "fetched events from file feed"
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_parse_ts_keeps_microseconds() {
        assert_eq!(
            parse_ts("1705284000.123456"),
            Some(datetime!(2024-01-15 02:00:00.123456 UTC))
        );
        assert_eq!(parse_ts("1705284000"), Some(datetime!(2024-01-15 02:00:00 UTC)));
    }

    #[test]
    fn test_parse_ts_rejects_garbage() {
        assert_eq!(parse_ts(""), None);
        assert_eq!(parse_ts("abc"), None);
        assert_eq!(parse_ts("12.3x"), None);
    }

    #[test]
    fn test_next_cursor_requires_has_more() {
        let page: HistoryPage = serde_json::from_str(
            r#"{"messages": [], "has_more": false, "response_metadata": {"next_cursor": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(page.next_cursor(), None);

        let page: HistoryPage = serde_json::from_str(
            r#"{"messages": [], "has_more": true, "response_metadata": {"next_cursor": ""}}"#,
        )
        .unwrap();
        assert_eq!(page.next_cursor(), None);
    }

    #[test]
    fn test_validate_name_rejects_paths() {
        assert!(validate_name("channel", "ops").is_ok());
        assert!(validate_name("channel", "../ops").is_err());
        assert!(validate_name("cursor", "a/b").is_err());
        assert!(validate_name("cursor", "").is_err());
    }
}
