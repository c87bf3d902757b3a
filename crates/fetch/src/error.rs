//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A fetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server answered with a non-success status.
    #[display("HTTP status {_0}")]
    Status(#[error(not(source))] u16),
    /// No complete response within the per-attempt timeout.
    #[display("request timed out")]
    Timeout,
    /// Could not connect to the server.
    #[display("connection failed: {_0}")]
    Connect(#[error(not(source))] String),
    /// The request failed for another transport reason (TLS, redirects, body read).
    #[display("request failed: {_0}")]
    Request(#[error(not(source))] String),
    /// The response is text, not binary data.
    #[display("response is not binary data ({_0})")]
    NotBinary(#[error(not(source))] String),
    /// The response body is empty.
    #[display("response body is empty")]
    EmptyBody,
    /// Header constraints admit no browser profile, or a header value is malformed.
    #[display("cannot generate headers: {_0}")]
    Headers(#[error(not(source))] String),
    /// The HTTP client could not be constructed.
    #[display("cannot build HTTP client")]
    Client,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Timeouts, connection failures, `408`, `429` and `5xx` are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Status(status) => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Status(404).to_string(), "HTTP status 404");
        assert_eq!(ErrorKind::NotBinary("text/html".to_string()).to_string(), "response is not binary data (text/html)");
    }

    #[rstest]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::Connect("refused".to_string()), true)]
    #[case(ErrorKind::Status(408), true)]
    #[case(ErrorKind::Status(429), true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Status(404), false)]
    #[case(ErrorKind::Status(403), false)]
    #[case(ErrorKind::EmptyBody, false)]
    #[case(ErrorKind::NotBinary("text/plain".to_string()), false)]
    fn error_kind_retryable(#[case] kind: ErrorKind, #[case] retryable: bool) {
        assert_eq!(kind.is_retryable(), retryable);
    }
}
