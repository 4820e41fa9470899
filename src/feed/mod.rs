//! Raw event feed collaborators.
//!
//! The refresh workflow only depends on the `EventFeed` trait. `FileFeed`
//! reads paged channel-history exports from disk; `MockFeed` returns scripted
//! events for tests.

pub mod file;
pub mod mock;
pub mod traits;

pub use file::FileFeed;
pub use mock::MockFeed;
pub use traits::{EventFeed, FetchWindow};
