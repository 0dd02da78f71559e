use chrono::{DateTime, Utc};

pub const FIXED_TIME_ENV: &str = "IOC_HARVESTER_FIXED_TIME";

pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var(FIXED_TIME_ENV) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}

/// Commit message used when the feed carried no last-updated marker.
pub fn fallback_commit_message() -> String {
    format!("Feed update {}", now_utc().to_rfc3339())
}
