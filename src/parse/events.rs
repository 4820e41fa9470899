//! Session state machine over a batch of raw notification events.
//!
//! A nightly run announces itself with a start marker, posts one line per
//! finished step (`<name> : Completed in <duration>` or `<name> : Failure...`)
//! and closes with an end marker. Lines outside a session carry no context
//! and are ignored.

use std::sync::OnceLock;

use regex::Regex;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, warn};

use crate::core::schema::format_date;
use crate::core::{RawEvent, TOTAL_NIGHTLY_PROCESS, WorkflowRecord};

use super::duration::parse_duration;

pub const DEFAULT_START_MARKER: &str = "Starting Nightly Process";
pub const DEFAULT_END_MARKER: &str = "Nightly Process Completed";

fn completed_re() -> &'static Regex {
    static COMPLETED_RE: OnceLock<Regex> = OnceLock::new();
    COMPLETED_RE.get_or_init(|| {
        Regex::new(r"^(.+?)\s*:\s*Completed in\s+(.+)\n?\z").expect("valid completion regex")
    })
}

fn failure_re() -> &'static Regex {
    static FAILURE_RE: OnceLock<Regex> = OnceLock::new();
    FAILURE_RE
        .get_or_init(|| Regex::new(r"^(.+?)\s*:\s*Failure\w*(.*)").expect("valid failure regex"))
}

/// Marker strings and calendar offset used while parsing.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub start_marker: String,
    pub end_marker: String,
    /// Offset applied to event instants before taking their calendar date
    pub utc_offset: UtcOffset,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
            utc_offset: UtcOffset::UTC,
        }
    }
}

/// Parse state, alive for one pass only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSession {
    Idle,
    Active {
        date: Date,
        started_at: OffsetDateTime,
        /// Baseline for failure durations: the most recent event seen in the session
        last_event_at: OffsetDateTime,
        /// Set once the end marker has been seen
        ended: bool,
    },
}

/// Classification of a single event's text.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Start,
    End,
    Completed { name: &'a str, duration_text: &'a str },
    Failed { name: &'a str, message: String },
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct EventParser {
    options: ParserOptions,
}

impl EventParser {
    pub fn new(options: ParserOptions) -> Self {
        EventParser { options }
    }

    /// Parse a batch of events into workflow records.
    ///
    /// Events are sorted by timestamp first (stable on ties), so arrival order
    /// from the feed does not matter. Records come out in event order.
    pub fn parse(&self, mut events: Vec<RawEvent>) -> Vec<WorkflowRecord> {
        events.sort_by_key(|e| e.timestamp);

        let mut session = ParseSession::Idle;
        let mut records = Vec::new();

        for event in &events {
            session = self.step(session, event, &mut records);
        }

        debug!(
            events = events.len(),
            records = records.len(),
            "parsed notification batch"
        );
        records
    }

    fn step(
        &self,
        session: ParseSession,
        event: &RawEvent,
        records: &mut Vec<WorkflowRecord>,
    ) -> ParseSession {
        let at = event.timestamp;
        let line = self.classify(&event.text);

        let ParseSession::Active {
            date,
            started_at,
            last_event_at,
            ended,
        } = session
        else {
            return match line {
                Line::Start => self.begin(at),
                _ => ParseSession::Idle,
            };
        };

        match line {
            Line::Start => {
                if !ended {
                    warn!(
                        abandoned = %format_date(date),
                        "start marker before end marker, restarting session"
                    );
                }
                self.begin(at)
            }
            Line::End => {
                let total = (at - started_at).as_seconds_f64();
                records.push(WorkflowRecord::success(TOTAL_NIGHTLY_PROCESS, date, total, at));
                ParseSession::Active {
                    date,
                    started_at,
                    last_event_at: at,
                    ended: true,
                }
            }
            Line::Completed {
                name,
                duration_text,
            } => {
                let seconds = parse_duration(duration_text) as f64;
                records.push(WorkflowRecord::success(name, date, seconds, at));
                ParseSession::Active {
                    date,
                    started_at,
                    last_event_at: at,
                    ended,
                }
            }
            Line::Failed { name, message } => {
                let elapsed = (at - last_event_at).as_seconds_f64();
                records.push(WorkflowRecord::failure(name, date, elapsed, at, message));
                ParseSession::Active {
                    date,
                    started_at,
                    last_event_at: at,
                    ended,
                }
            }
            Line::Other => ParseSession::Active {
                date,
                started_at,
                last_event_at: at,
                ended,
            },
        }
    }

    fn begin(&self, at: OffsetDateTime) -> ParseSession {
        ParseSession::Active {
            date: at.to_offset(self.options.utc_offset).date(),
            started_at: at,
            last_event_at: at,
            ended: false,
        }
    }

    /// Precedence: start > end > completion > failure > other.
    fn classify<'a>(&self, text: &'a str) -> Line<'a> {
        if text.contains(self.options.start_marker.as_str()) {
            return Line::Start;
        }
        if text.contains(self.options.end_marker.as_str()) {
            return Line::End;
        }
        if let Some(caps) = completed_re().captures(text) {
            if let (Some(name), Some(duration)) = (caps.get(1), caps.get(2)) {
                return Line::Completed {
                    name: name.as_str().trim(),
                    duration_text: duration.as_str().trim(),
                };
            }
        }

        let mut lines = text.split('\n');
        let first = lines.next().unwrap_or_default();
        if let Some(caps) = failure_re().captures(first) {
            if let Some(name) = caps.get(1) {
                let detail = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                return Line::Failed {
                    name: name.as_str().trim(),
                    message: failure_message(detail, lines),
                };
            }
        }

        Line::Other
    }
}

/// Join the failure detail with the event's continuation lines.
///
/// The separator after the `Failure` keyword is dropped. An error record never
/// carries an empty message, so a bare `Failure` keeps the keyword itself.
fn failure_message<'a>(detail: &'a str, rest: impl Iterator<Item = &'a str>) -> String {
    let detail = detail.trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace());
    let mut parts = vec![detail.trim_end()];
    parts.extend(rest);
    let message = parts.join("\n").trim().to_string();
    if message.is_empty() {
        "Failure".to_string()
    } else {
        message
    }
}
