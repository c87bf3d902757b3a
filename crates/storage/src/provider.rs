//! Resolution of store identifiers to opened backends.

use crate::backend::LocalBackend;
use crate::error::{ErrorKind, Result};
use crate::BackendHandle;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

/// Opens stores by identifier.
///
/// Implementations are shared between all workers of a batch, and must hand
/// out handles that are safe for concurrent use.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Open (or create) the store named `store_id`.
    async fn open(&self, store_id: &str) -> Result<BackendHandle>;
}

pub type ProviderHandle = Arc<dyn StoreProvider + Send + Sync>;

/// Store identifiers are a single key segment: no separators, no traversal.
fn validate_store_id(store_id: &str) -> Result<&str> {
    if store_id.is_empty() || store_id == "." || store_id == ".." || store_id.contains(['/', '\\', '\0']) {
        exn::bail!(ErrorKind::InvalidKey(store_id.to_string()));
    }
    Ok(store_id)
}

/// Stores kept as sub-directories of a common root on the local filesystem.
///
/// Opened stores are cached, so every worker asking for the same identifier
/// shares one [`LocalBackend`].
pub struct LocalStores {
    root: PathBuf,
    public_base: Option<Url>,
    opened: Mutex<HashMap<String, BackendHandle>>,
}
impl LocalStores {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), public_base: None, opened: Mutex::new(HashMap::new()) }
    }

    /// Public URLs of a store become `{base}/{store_id}/{key}`.
    pub fn with_public_base(mut self, base: Url) -> Self {
        self.public_base = Some(base);
        self
    }
}

#[async_trait]
impl StoreProvider for LocalStores {
    async fn open(&self, store_id: &str) -> Result<BackendHandle> {
        let store_id = validate_store_id(store_id)?;
        let mut opened = self.opened.lock().await;
        if let Some(handle) = opened.get(store_id) {
            return Ok(handle.clone());
        }
        let mut backend = LocalBackend::new(store_id, self.root.join(store_id))?;
        if let Some(base) = &self.public_base {
            let base = base.join(&format!("{store_id}/")).map_err(|e| ErrorKind::BackendError(e.to_string()))?;
            backend = backend.with_public_base(base);
        }
        tracing::debug!(store = store_id, root = %self.root.display(), "Opened local store");
        let handle: BackendHandle = Arc::new(backend);
        opened.insert(store_id.to_string(), handle.clone());
        Ok(handle)
    }
}

/// Connection details shared by every store of an [`S3Stores`].
#[cfg(feature = "s3")]
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Stores live under `{prefix}/{store_id}/` when set, `{store_id}/` otherwise.
    pub prefix: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub key_id: String,
    pub key_secret: String,
}

/// Stores kept as key prefixes of a single S3-compatible bucket.
#[cfg(feature = "s3")]
pub struct S3Stores {
    config: S3Config,
    public_base: Option<Url>,
    opened: Mutex<HashMap<String, BackendHandle>>,
}
#[cfg(feature = "s3")]
impl S3Stores {
    pub fn new(config: S3Config) -> Self {
        Self { config, public_base: None, opened: Mutex::new(HashMap::new()) }
    }

    /// Public URLs of a store become `{base}/{prefix}/{store_id}/{key}`.
    pub fn with_public_base(mut self, base: Url) -> Self {
        self.public_base = Some(base);
        self
    }
}

#[cfg(feature = "s3")]
#[async_trait]
impl StoreProvider for S3Stores {
    async fn open(&self, store_id: &str) -> Result<BackendHandle> {
        let store_id = validate_store_id(store_id)?;
        let mut opened = self.opened.lock().await;
        if let Some(handle) = opened.get(store_id) {
            return Ok(handle.clone());
        }
        let prefix = match self.config.prefix.as_deref().map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{prefix}/{store_id}"),
            None => store_id.to_string(),
        };
        let mut backend = crate::backend::S3Backend::new(
            store_id,
            &self.config.bucket,
            Some(prefix),
            &self.config.region,
            self.config.endpoint.clone(),
            &self.config.key_id,
            &self.config.key_secret,
        )?;
        if let Some(base) = &self.public_base {
            backend = backend.with_public_base(base);
        }
        tracing::debug!(store = store_id, bucket = %self.config.bucket, "Opened S3 store");
        let handle: BackendHandle = Arc::new(backend);
        opened.insert(store_id.to_string(), handle.clone());
        Ok(handle)
    }
}

/// A fixed set of already-opened stores. Unknown identifiers are
/// [`StoreNotFound`](ErrorKind::StoreNotFound).
#[derive(Default, Clone)]
pub struct StaticStores {
    stores: HashMap<String, BackendHandle>,
}
impl StaticStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store_id: impl Into<String>, backend: BackendHandle) -> Self {
        self.stores.insert(store_id.into(), backend);
        self
    }
}

#[async_trait]
impl StoreProvider for StaticStores {
    async fn open(&self, store_id: &str) -> Result<BackendHandle> {
        let store_id = validate_store_id(store_id)?;
        self.stores.get(store_id).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::StoreNotFound(store_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use rstest::rstest;

    #[rstest]
    #[case("default")]
    #[case("my-store_01")]
    fn test_valid_store_ids(#[case] id: &str) {
        assert!(validate_store_id(id).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("a\\b")]
    fn test_invalid_store_ids(#[case] id: &str) {
        assert!(validate_store_id(id).is_err());
    }

    #[tokio::test]
    async fn test_local_stores_share_handles() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stores = LocalStores::new(temp_dir.path());
        let first = stores.open("inputs").await.unwrap();
        first.put("cat.png", b"png", "image/png").await.unwrap();
        let second = stores.open("inputs").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(temp_dir.path().join("inputs/cat.png").exists());
    }

    #[tokio::test]
    async fn test_local_stores_public_base() {
        let temp_dir = tempfile::tempdir().unwrap();
        let base = Url::parse("https://cdn.example.com/kv/").unwrap();
        let stores = LocalStores::new(temp_dir.path()).with_public_base(base);
        let store = stores.open("output").await.unwrap();
        assert_eq!(store.public_url("image_0_1").unwrap(), "https://cdn.example.com/kv/output/image_0_1");
    }

    #[cfg(feature = "s3")]
    #[tokio::test]
    async fn test_s3_stores_prefix_each_store() {
        let config = S3Config {
            bucket: "bucket".to_string(),
            prefix: Some("imgbatch/".to_string()),
            region: "us-west-004".to_string(),
            endpoint: Some("https://s3.us-west-004.backblazeb2.com".to_string()),
            key_id: "key".to_string(),
            key_secret: "secret".to_string(),
        };
        let stores = S3Stores::new(config);
        let output = stores.open("output").await.unwrap();
        assert_eq!(output.name(), "output");
        assert_eq!(
            output.public_url("image_0_1").unwrap(),
            "https://s3.us-west-004.backblazeb2.com/bucket/imgbatch/output/image_0_1"
        );
        assert!(Arc::ptr_eq(&output, &stores.open("output").await.unwrap()));
        assert!(stores.open("../escape").await.is_err());
    }

    #[tokio::test]
    async fn test_static_stores() {
        let stores = StaticStores::new().with_store("mock", Arc::new(MockBackend::default()));
        assert!(stores.open("mock").await.is_ok());
        let err = stores.open("other").await.err().unwrap();
        assert!(matches!(&*err, ErrorKind::StoreNotFound(id) if id == "other"));
    }
}
