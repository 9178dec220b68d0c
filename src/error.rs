//! Error types for the TokenTally client.

/// Result type for TokenTally operations.
pub type Result<T> = std::result::Result<T, TokenTallyError>;

/// Errors that can occur when using the TokenTally client.
///
/// The variant set is part of the public API: callers match on it to decide
/// how to react. [`RateLimit`](Self::RateLimit) and [`Http`](Self::Http) are
/// the variants a caller may reasonably retry; the client itself never
/// retries.
#[derive(Debug, thiserror::Error)]
pub enum TokenTallyError {
    /// Input rejected locally before submission, or by the service (4xx).
    #[error("validation error: {0}")]
    Validation(String),

    /// The API key was rejected by the service (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service is rate limiting this key (HTTP 429).
    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    /// The service returned an unexpected error status (5xx).
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, or a generic fallback.
        message: String,
    },

    /// Transport-level failure (timeout, connection refused, DNS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A tracking session was used out of order.
    #[error("session misuse: {0}")]
    Misuse(String),
}
