//! Local filesystem storage backend.
//!
//! Records are stored as plain files in a configured directory, accessed with
//! `tokio::fs` for async I/O. The content type of each record is kept in a
//! small JSON sidecar next to the data file, so that the data file itself is
//! byte-for-byte what was written (and can be opened by any image viewer).

use crate::error::ErrorKind;
use crate::{Record, StorageBackend, content_type, error::Result, validate_key};
use async_trait::async_trait;
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

/// Suffix of the sidecar file holding a record's metadata.
const METADATA_SUFFIX: &str = ".__metadata__.json";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    content_type: String,
}

/// Local filesystem storage backend.
///
/// Stores records in a directory on the local filesystem. All keys are
/// relative to the configured root directory.
///
/// # Examples
///
/// ```no_run
/// use imgbatch_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("default", "/var/lib/imgbatch/stores/default")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the store
    root: PathBuf,
    /// Base URL that public URLs are built from, instead of `file://` URLs.
    public_base: Option<Url>,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `name` - Name of the store (used for logging)
    /// * `root` - Path to the store's root directory. Relative paths are
    ///   resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be made absolute, or if it exists
    /// and is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let invalid_root = || ErrorKind::InvalidRoot(root.display().to_string());
        let root = std::path::absolute(root).or_raise(invalid_root)?;

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(invalid_root());
            }
        } else {
            // Use non-async here; it'll only happen once when the store is
            // opened and it's not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }

        Ok(Self { name: name.into(), root, public_base: None })
    }

    /// Build public URLs from `base` (e.g. a static file server in front of
    /// the store directory) instead of `file://` URLs.
    pub fn with_public_base(mut self, base: Url) -> Self {
        self.public_base = Some(Self::directory_url(base));
        self
    }

    /// Make sure a base URL ends with `/` so that [`Url::join`] appends to it
    /// rather than replacing its last segment.
    fn directory_url(mut url: Url) -> Url {
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url
    }

    /// Validate a key and return it along with its absolute data path.
    fn absolute_path(&self, key: &str) -> Result<(String, PathBuf)> {
        let validated = validate_key(key)?;
        if validated.ends_with(METADATA_SUFFIX) {
            exn::bail!(ErrorKind::InvalidKey(validated));
        }
        let path = self.root.join(&validated);
        Ok((validated, path))
    }

    fn sidecar_path(data_path: &Path) -> PathBuf {
        let mut name = data_path.as_os_str().to_os_string();
        name.push(METADATA_SUFFIX);
        PathBuf::from(name)
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Content type recorded for a key. Files dropped into the store directory
    /// by hand have no sidecar, so fall back to guessing from the extension.
    async fn read_content_type(&self, key: &str, data_path: &Path) -> Result<String> {
        match fs::read(Self::sidecar_path(data_path)).await {
            Ok(raw) => {
                let sidecar: Sidecar =
                    serde_json::from_slice(&raw).or_raise(|| ErrorKind::Metadata(key.to_string()))?;
                Ok(sidecar.content_type)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(content_type::from_extension(key).to_string()),
            Err(e) => Err(Self::map_io_error(e, key).into()),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let (_, path) = self.absolute_path(key)?;
        Ok(fs::try_exists(&path).await.map_err(ErrorKind::Io)?)
    }

    async fn get(&self, key: &str) -> Result<Record> {
        let (key, path) = self.absolute_path(key)?;
        let data = fs::read(&path).await.map_err(|e| Self::map_io_error(e, &key))?;
        let content_type = self.read_content_type(&key, &path).await?;
        Ok(Record { data, content_type })
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let (key, path) = self.absolute_path(key)?;
        // Create parent directories if needed, to keep behaviour
        // consistent with S3-compatible storage.
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, &key))?;
        }
        let sidecar = serde_json::to_vec(&Sidecar { content_type: content_type.to_string() })
            .or_raise(|| ErrorKind::Metadata(key.clone()))?;
        fs::write(&path, data).await.map_err(|e| Self::map_io_error(e, &key))?;
        fs::write(Self::sidecar_path(&path), sidecar).await.map_err(|e| Self::map_io_error(e, &key))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (key, path) = self.absolute_path(key)?;
        fs::remove_file(&path).await.map_err(|e| Self::map_io_error(e, &key))?;
        // A missing sidecar is fine, the record may have been placed by hand.
        match fs::remove_file(Self::sidecar_path(&path)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Self::map_io_error(e, &key).into()),
            _ => Ok(()),
        }
    }

    fn public_url(&self, key: &str) -> Result<String> {
        let (key, path) = self.absolute_path(key)?;
        let url = match &self.public_base {
            Some(base) => base.join(&key).or_raise(|| ErrorKind::InvalidKey(key.clone()))?,
            None => Url::from_file_path(&path)
                .map_err(|()| ErrorKind::BackendError(format!("cannot build file URL for `{}`", path.display())))?,
        };
        Ok(url.to_string())
    }
}
