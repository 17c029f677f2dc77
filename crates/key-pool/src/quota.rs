//! Rate-limit body classification for NewsData.io 429 responses
//!
//! NewsData answers both short-window rate limiting and daily credit
//! exhaustion with 429. The body text is the only hint that separates them,
//! and its format is not contractual, so anything that cannot be read is
//! treated as an ordinary rate limit.

use std::time::Duration;

/// How long a key is parked after its daily quota is gone.
pub const QUOTA_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Daily-quota phrasing in 429 bodies (matched lowercase).
const QUOTA_PATTERNS: &[&str] = &[
    "daily limit",
    "daily quota",
    "quota exceeded",
    "api credits",
    "credit limit",
    "apilimitexceeded",
];

/// What a 429 body says about the rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitBody {
    /// The body carried an error message or code we could read.
    Recognized { quota_exceeded: bool },
    /// Empty, non-JSON, or JSON without any error text.
    Unrecognized,
}

impl RateLimitBody {
    /// How long the key should stay unavailable.
    ///
    /// Only a recognized quota message overrides the retry-after window.
    pub fn unavailable_window(self, retry_after: Duration) -> Duration {
        match self {
            RateLimitBody::Recognized {
                quota_exceeded: true,
            } => QUOTA_WINDOW,
            _ => retry_after,
        }
    }

    /// Label for logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            RateLimitBody::Recognized {
                quota_exceeded: true,
            } => "quota_exhausted",
            _ => "rate_limited",
        }
    }
}

/// Classify a 429 response body.
///
/// Looks for error text in the shapes NewsData and generic APIs use:
/// `results.message`, `results.code`, `message`, `code`, `error` (string) and
/// `error.message`. All text found is checked against the quota patterns.
pub fn classify_rate_limit_body(body: &str) -> RateLimitBody {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return RateLimitBody::Unrecognized;
    };

    let candidates = [
        value.pointer("/results/message"),
        value.pointer("/results/code"),
        value.get("message"),
        value.get("code"),
        value.get("error"),
        value.pointer("/error/message"),
    ];
    let text: Vec<String> = candidates
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::to_lowercase)
        .collect();

    if text.is_empty() {
        return RateLimitBody::Unrecognized;
    }

    let quota_exceeded = text
        .iter()
        .any(|t| QUOTA_PATTERNS.iter().any(|pattern| t.contains(pattern)));
    RateLimitBody::Recognized { quota_exceeded }
}
