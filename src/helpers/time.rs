use chrono::{DateTime, SecondsFormat, Utc};

/// Render an optional timestamp for summaries; `-` when absent
pub fn fmt_opt_ts(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}
