//! Error types for NewsData requests
//!
//! Rate limiting never appears here: it is absorbed by key rotation or turned
//! into an empty response. No variant ever carries key material; bodies and
//! transport messages are redacted before they are stored.

use thiserror::Error;

/// Longest upstream body excerpt kept in an error.
pub const BODY_EXCERPT_CHARS: usize = 512;

/// Errors surfaced to callers of the client.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable key, invalid base URL, or HTTP client construction failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection failures and timeouts that outlived the ordinary retries.
    #[error("network error after {attempts} attempts: {message}")]
    Network { attempts: u32, message: String },

    /// Non-429 error status from NewsData.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// A 2xx response whose body is not a NewsData result envelope.
    #[error("invalid response body: {0}")]
    Parse(String),
}

impl Error {
    /// Whether the ordinary retry policy applies (transport failures, 5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { .. } => true,
            Error::Upstream { status, .. } => *status >= 500,
            Error::Config(_) | Error::Parse(_) => false,
        }
    }
}

impl From<key_pool::Error> for Error {
    fn from(err: key_pool::Error) -> Self {
        match err {
            key_pool::Error::Config(msg) => Error::Config(msg),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Truncate a body to [`BODY_EXCERPT_CHARS`] characters.
pub(crate) fn excerpt(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
