//! Read-only storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and prevents write operations from executing, but
//! indicating success on return. Used for dry runs.

use async_trait::async_trait;

use crate::{BackendHandle, Record, StorageBackend, error::Result};

/// Read-only storage backend.
///
/// Wraps another backend and silently drops all write operations, logging an
/// [`info event`](tracing::Event). Public URLs are still generated by the
/// wrapped backend, so a dry-run report looks exactly like a real one.
#[derive(Clone)]
pub struct ReadOnlyBackend {
    inner: BackendHandle,
}
impl ReadOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for ReadOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.inner.exists(key).await
    }

    async fn get(&self, key: &str) -> Result<Record> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        tracing::info!(store = self.inner.name(), key, bytes = data.len(), content_type, "Skipping write during read-only mode");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        tracing::info!(store = self.inner.name(), key, "Skipping delete during read-only mode");
        Ok(())
    }

    fn public_url(&self, key: &str) -> Result<String> {
        self.inner.public_url(key)
    }
}
