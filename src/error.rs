//! Mimir error types

use std::time::Duration;

/// Mimir error types
#[derive(Debug, thiserror::Error)]
pub enum MimirError {
    // Caller errors, raised where the bad value was introduced
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The weighted source table and the generator's source map disagree.
    ///
    /// This is a configuration bug in how the option set was seeded, not a
    /// recoverable condition. Never retried.
    #[error("source mismatch: {0}")]
    SourceMismatch(String),

    // Source/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from source")]
    EmptyResponse,

    #[error("source does not support this operation: {0}")]
    Unsupported(&'static str),

    // Configuration errors
    #[error("no source configured")]
    NoSource,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MimirError {
    /// Whether the error is worth retrying.
    ///
    /// Only transport failures qualify: connection errors, rate limits and
    /// 5xx responses. Everything raised by the cache and selectors is
    /// permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            MimirError::Http(_) | MimirError::RateLimited { .. } => true,
            MimirError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Server-provided backoff hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            MimirError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Mimir operations
pub type Result<T> = std::result::Result<T, MimirError>;
