//! Keyed blob stores.
//!
//! A store maps string keys to [`Record`]s (raw bytes plus the content type
//! they were written with). Input images may be read from one store, and
//! processed output is always written to one. Each store is an implementation
//! of [`StorageBackend`], and a [`StoreProvider`] resolves store identifiers
//! (the `storeId` in a `key-value://{storeId}/{key}` reference) to opened
//! backends.

pub mod backend;
pub mod error;
mod models;
mod path;
mod provider;

pub use crate::backend::StorageBackend;
pub use crate::models::{Record, ValueKind, content_type};
pub use crate::path::validate as validate_key;
pub use crate::provider::{LocalStores, ProviderHandle, StaticStores, StoreProvider};
#[cfg(feature = "s3")]
pub use crate::provider::{S3Config, S3Stores};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
