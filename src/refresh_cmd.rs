//! CLI command handler for `refresh`.

use crate::HistoryResult;
use crate::config::Config;
use crate::engine::{RefreshOrchestrator, RefreshOutcome};
use crate::feed::FileFeed;

/// Run a refresh against the file feed in `config.feed_dir` and print the
/// outcome as a JSON envelope on stdout.
///
/// A refresh that finds no data or fails to save is still reported through
/// the envelope; only configuration problems surface as errors.
pub fn run(config: Config) -> HistoryResult<RefreshOutcome> {
    let feed = FileFeed::new(&config.feed_dir);
    let orchestrator = RefreshOrchestrator::new(config, &feed)?;
    let outcome = orchestrator.refresh();

    let json = serde_json::to_string_pretty(&outcome)?;
    println!("{json}");
    Ok(outcome)
}
