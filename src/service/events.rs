use std::time::Duration;

use serde::Serialize;

use crate::collectors::CycleResults;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CollectionEvent {
    Completed {
        job: &'static str,
        results: CycleResults,
        elapsed_ms: u64,
    },
    Failed {
        job: &'static str,
        message: String,
    },
}

/// Callbacks invoked after every cycle
///
/// A panicking observer is logged and otherwise ignored.
pub trait CollectionObserver: Send + Sync {
    fn on_complete(&self, _results: &CycleResults, _elapsed: Duration) {}

    fn on_error(&self, _message: &str) {}
}
