//! Transform Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A transform error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for transform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// None of these are retryable: the same bytes under the same options will
/// fail the same way.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input could not be decoded, or output could not be encoded.
    #[display("codec failure: {_0}")]
    CodecFailure(#[error(not(source))] String),
    /// The requested output format is not one we can produce.
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// A transform option (fit, position, quality, background) is malformed.
    #[display("invalid transform option: {_0}")]
    InvalidSpec(#[error(not(source))] String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::UnsupportedFormat("bmp".to_string()).to_string(), "unsupported format: bmp");
        assert_eq!(
            ErrorKind::CodecFailure("unrecognised image format".to_string()).to_string(),
            "codec failure: unrecognised image format"
        );
    }

    #[test]
    fn error_from_kind() {
        let err: Result<()> = Err(ErrorKind::InvalidSpec("quality 0".to_string()).into());
        let exn = err.unwrap_err();
        // Exn<E> implements Deref<Target = E>
        assert_eq!(*exn, ErrorKind::InvalidSpec("quality 0".to_string()));
    }
}
