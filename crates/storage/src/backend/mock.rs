//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{Record, StorageBackend, validate_key};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Records are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Ideal for unit
/// tests that need a [`StorageBackend`] without filesystem or network
/// dependencies.
///
/// # Examples
///
/// ```ignore
/// use imgbatch_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("inputs/cat.png", b"\x89PNG..."),
/// ]);
/// assert!(backend.exists("inputs/cat.png").await?);
///
/// backend.put("image_0_1", b"RIFF...", "image/webp").await?;
/// assert_eq!(backend.get("image_0_1").await?.content_type, "image/webp");
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<String, Record>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with binary records.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        Self::with_records(files.into_iter().map(|(key, data)| (key, Record::binary(data))))
    }

    /// Create a mock backend pre-populated with records of any content type.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use imgbatch_storage::{Record, backend::MockBackend};
    ///
    /// let backend = MockBackend::with_records([
    ///     ("config", Record::new(b"{}".to_vec(), "application/json")),
    ///     ("latin1", Record::new(b"\xFF\xD8".to_vec(), "text/plain")),
    /// ]);
    /// ```
    pub fn with_records(records: impl IntoIterator<Item = (impl Into<String>, Record)>) -> Self {
        let mut map = HashMap::new();
        for (key, record) in records {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_records: invalid key {key}");
            };
            map.insert(validated, record);
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Make every subsequent [`put`](StorageBackend::put) fail with a
    /// [`Network`](ErrorKind::Network) error.
    pub fn with_failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    /// Number of successful writes performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of all keys currently held, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &[u8]); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn get(&self, key: &str) -> Result<Record> {
        let key = validate_key(key)?;
        self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        let key = validate_key(key)?;
        if self.fail_writes.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Network(format!("refusing to write {key}")));
        }
        self.storage.write().await.insert(key, Record::new(data, content_type));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.remove(&key).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }

    fn public_url(&self, key: &str) -> Result<String> {
        let key = validate_key(key)?;
        Ok(format!("memory://{}/{key}", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get() {
        let backend = MockBackend::default();
        backend.put("test", b"hello", "image/png").await.unwrap();
        let record = backend.get("test").await.unwrap();
        assert_eq!(record.data, b"hello");
        assert_eq!(record.content_type, "image/png");
        assert_eq!(backend.write_count(), 1);
    }

    #[tokio::test]
    async fn test_with_files() {
        let backend = MockBackend::with_files([("a/file.png", Vec::from(*b"png")), ("b/file.gif", Vec::from(*b"gif"))]);
        assert!(backend.exists("a/file.png").await.unwrap());
        assert!(backend.exists("b/file.gif").await.unwrap());
        assert!(!backend.exists("c/nope").await.unwrap());
        assert_eq!(backend.keys().await, vec!["a/file.png", "b/file.gif"]);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let backend = MockBackend::default();
        let err = backend.get("missing").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = MockBackend::default();
        backend.put("file", b"data", "image/png").await.unwrap();
        backend.delete("file").await.unwrap();
        assert!(!backend.exists("file").await.unwrap());
        let err = backend.delete("file").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let backend = MockBackend::default().with_failing_writes();
        let err = backend.put("file", b"data", "image/png").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert_eq!(backend.write_count(), 0);
        assert!(!backend.exists("file").await.unwrap());
    }

    #[test]
    fn test_public_url() {
        let backend = MockBackend::default().with_name("output");
        assert_eq!(backend.public_url("image_0_1").unwrap(), "memory://output/image_0_1");
    }

    #[tokio::test]
    async fn test_key_traversal_rejected() {
        let backend = MockBackend::default();
        assert!(backend.get("../etc/passwd").await.is_err());
        assert!(backend.put("../escape", b"bad", "image/png").await.is_err());
    }

    #[test]
    #[should_panic(expected = "invalid key")]
    fn test_with_files_panics_on_bad_key() {
        MockBackend::with_files([("../escape", Vec::from(*b"bad"))]);
    }
}
