//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! key-value interface across different backends (local filesystem,
//! S3-compatible services, in-memory for tests).

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod ro;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::ro::ReadOnlyBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::Record;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::ops::Deref;

/// Unified interface for keyed blob stores.
///
/// All operations are asynchronous so that network-backed stores don't block
/// the runtime, and every method takes `&self` so a single handle can be shared
/// by many concurrent workers. Implementations must be safe for that kind of
/// concurrent use; nothing above this trait serializes access.
///
/// # Key Handling
/// All keys are relative to the store root and must be validated using
/// [`validate_key`](crate::validate_key) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use imgbatch_storage::{backend::StorageBackend, content_type, error::Result};
///
/// async fn copy_record(from: &dyn StorageBackend, to: &dyn StorageBackend, key: &str) -> Result<String> {
///     let record = from.get(key).await?;
///     to.put(key, &record.data, &record.content_type).await?;
///     to.public_url(key)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the opened store. For stores opened through a
    /// [`StoreProvider`](crate::StoreProvider) this is the store identifier.
    /// Used for logging only.
    fn name(&self) -> &str;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Read a record.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key
    /// does not exist.
    async fn get(&self, key: &str) -> Result<Record>;

    /// Read a record, mapping [`NotFound`](crate::error::ErrorKind::NotFound)
    /// to `None`.
    ///
    /// The default implementation wraps [`get()`](Self::get).
    async fn get_if_exists(&self, key: &str) -> Result<Option<Record>> {
        match self.get(key).await {
            Ok(record) => Ok(Some(record)),
            Err(e) if matches!(e.deref(), ErrorKind::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Write a record.
    ///
    /// Creates a new record or overwrites an existing one. The content type is
    /// stored alongside the data and returned by [`get()`](Self::get).
    ///
    /// ```no_run
    /// # use imgbatch_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let png = b"\x89PNG...";
    /// backend.put("image_0_1700000000", png, "image/png").await?;
    /// # Ok(())
    /// # }
    /// ```
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Delete a record.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key
    /// does not exist.
    async fn delete(&self, key: &str) -> Result<()>;

    /// The URL at which a record can be retrieved by consumers of the batch
    /// report. The record does not have to exist yet; this is pure string
    /// construction and never touches the network.
    fn public_url(&self, key: &str) -> Result<String>;
}
