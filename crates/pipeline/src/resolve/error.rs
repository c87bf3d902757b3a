//! Resolve Error Types

use derive_more::{Display, Error};
use imgbatch_fetch::error::Error as FetchError;
use imgbatch_storage::error::{Error as StorageError, ErrorKind as StorageErrorKind};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

/// Why a source descriptor could not be turned into bytes.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote server could not deliver usable bytes.
    #[display("failed to fetch image from URL: {_0}")]
    FetchFailed(#[error(not(source))] String),
    /// A `key-value://` reference without a store ID or key.
    #[display("malformed key-value reference: {_0}, expected key-value://<storeId>/<key>")]
    MalformedReference(#[error(not(source))] String),
    #[display("key \"{key}\" not found in store \"{store_id}\"")]
    NotFound { store_id: String, key: String },
    /// The store could not be opened or read.
    #[display("failed to read from key-value store: {_0}")]
    Store(#[error(not(source))] String),
    /// The stored value is structured data, or text that is not a byte string.
    #[display("value in key-value store is not binary image data ({_0})")]
    UnsupportedValueType(#[error(not(source))] String),
    /// An `images` entry that is not a string at all.
    #[display("invalid image source {_0}: must be a non-empty string")]
    NotAString(#[error(not(source))] String),
    #[display("unsupported image source: {_0}, must start with http://, https:// or key-value://")]
    UnsupportedSource(#[error(not(source))] String),
}

impl ErrorKind {
    /// Raise a fetch error into this tree, keeping its message.
    #[track_caller]
    pub fn fetch(err: FetchError) -> Error {
        let detail = (*err).to_string();
        err.raise(ErrorKind::FetchFailed(detail))
    }

    /// Raise a storage error into this tree. A missing key becomes
    /// [`NotFound`](Self::NotFound), everything else [`Store`](Self::Store).
    #[track_caller]
    pub fn store(err: StorageError, store_id: &str, key: &str) -> Error {
        let kind = match &*err {
            StorageErrorKind::NotFound(_) => {
                ErrorKind::NotFound { store_id: store_id.to_string(), key: key.to_string() }
            },
            other => ErrorKind::Store(other.to_string()),
        };
        err.raise(kind)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::Store(_))
    }
}
