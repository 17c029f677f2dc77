//! Error types for pool construction

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
