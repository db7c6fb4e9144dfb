//! Browser automation module
//!
//! Wraps agent-browser CLI for web automation.

mod executor;
mod runtime;
mod snapshot;

pub use executor::BrowserExecutor;
pub use runtime::BrowserRuntime;
pub use snapshot::{Element, Snapshot, SnapshotData};
