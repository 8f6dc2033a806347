//! Answer and test timing helpers.

use serde::{Deserialize, Serialize};

/// Elapsed-time record for one answer or one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingResult {
    /// Epoch milliseconds.
    pub start_time: i64,
    /// Epoch milliseconds.
    pub end_time: i64,
    /// Whole seconds, never less than 1.
    pub time_spent: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_within_time_limit: Option<bool>,
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Mark the start of an answer.
pub fn start_timing() -> i64 {
    now_ms()
}

/// Time from `start_time` to `end_time` (or now), rounded to whole seconds
/// and floored at 1 so per-question averages never divide by zero.
pub fn elapsed(start_time: i64, end_time: Option<i64>) -> TimingResult {
    let end_time = end_time.unwrap_or_else(now_ms);
    let seconds = ((end_time - start_time) as f64 / 1000.0).round() as i64;
    TimingResult {
        start_time,
        end_time,
        time_spent: seconds.max(1),
        is_within_time_limit: None,
    }
}

/// Annotate `timing` with whether it fits in `limit_secs`. Without a limit
/// the record passes through unchanged.
pub fn within_limit(timing: TimingResult, limit_secs: Option<u64>) -> TimingResult {
    match limit_secs {
        None => timing,
        Some(limit) => TimingResult {
            is_within_time_limit: Some(timing.time_spent <= limit as i64),
            ..timing
        },
    }
}

/// Whole seconds between two epoch-millisecond timestamps, rounded.
pub fn duration_secs(start_time: i64, end_time: i64) -> u64 {
    (((end_time - start_time).max(0)) as f64 / 1000.0).round() as u64
}
