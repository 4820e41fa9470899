//! Text interpretation of raw feed events.
//!
//! `duration` turns human duration text into seconds; `events` runs the
//! session state machine over a batch of events and emits `WorkflowRecord`s.

pub mod duration;
pub mod events;

pub use duration::parse_duration;
pub use events::{EventParser, ParseSession, ParserOptions};
