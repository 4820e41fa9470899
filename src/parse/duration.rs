//! Duration text such as `"19 mins, 42 secs"` to elapsed seconds.

use std::sync::OnceLock;

use regex::Regex;

fn minutes_re() -> &'static Regex {
    static MINUTES_RE: OnceLock<Regex> = OnceLock::new();
    MINUTES_RE.get_or_init(|| Regex::new(r"(\d+)\s*mins?").expect("valid minutes regex"))
}

fn seconds_re() -> &'static Regex {
    static SECONDS_RE: OnceLock<Regex> = OnceLock::new();
    SECONDS_RE.get_or_init(|| Regex::new(r"(\d+)\s*secs?").expect("valid seconds regex"))
}

/// First integer captured by `re`, or 0 when absent or too large for u64.
fn first_number(re: &Regex, text: &str) -> u64 {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Convert a duration string to total seconds.
///
/// Minutes and seconds are each optional; a missing part counts as zero, so
/// text without any recognizable duration yields 0. Never fails.
pub fn parse_duration(text: &str) -> u64 {
    let minutes = first_number(minutes_re(), text);
    let seconds = first_number(seconds_re(), text);
    minutes.saturating_mul(60).saturating_add(seconds)
}
