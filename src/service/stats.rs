use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cumulative outcome of the cycles a service has run
///
/// `last_error` only records cycle-level failures; per-device failures are
/// visible in each cycle's results.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total: u64,
    pub success: u64,
    pub fail: u64,
    pub last_collection_time: Option<DateTime<Utc>>,
    pub last_success_time: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}
