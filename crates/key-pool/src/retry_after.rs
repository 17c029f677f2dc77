//! `Retry-After` header interpretation

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Window used when upstream gives no usable `Retry-After`: the length of
/// NewsData's rate-limit window.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(900);

/// Turn a `Retry-After` header value into a wait duration.
///
/// Accepts delay-seconds (`"120"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`); a date in the past yields zero.
/// Missing or unparseable values fall back to [`DEFAULT_RETRY_AFTER`].
pub fn parse_retry_after(value: Option<&str>, now: DateTime<Utc>) -> Duration {
    let Some(value) = value.map(str::trim) else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(secs) = value.parse::<u64>() {
        return Duration::from_secs(secs);
    }

    match DateTime::parse_from_rfc2822(value) {
        Ok(at) => {
            let secs = (at.with_timezone(&Utc) - now).num_seconds().max(0);
            Duration::from_secs(secs as u64)
        }
        Err(_) => DEFAULT_RETRY_AFTER,
    }
}
