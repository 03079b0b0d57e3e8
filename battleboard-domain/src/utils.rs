use chrono::{Duration, Utc};

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn retention_cutoff_millis(now_ms: i64, retention_days: i64) -> i64 {
    now_ms - Duration::days(retention_days.max(0)).num_milliseconds()
}
