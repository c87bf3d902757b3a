//! Config Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every one of these is fatal for the whole batch: nothing has been
/// processed yet, and nothing will be until the input is fixed.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// `images` is missing or an empty list.
    #[display("input field \"images\" must be a non-empty array of image sources")]
    EmptyImages,
    /// Input or settings are malformed.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {_0}")]
    MissingFile(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
