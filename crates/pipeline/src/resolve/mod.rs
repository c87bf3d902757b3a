//! Turning an [`ImageSource`] into raw bytes.

pub mod error;

use self::error::{ErrorKind, Result};
use crate::source::ImageSource;
use imgbatch_fetch::{FetchRequest, FetcherHandle, HeaderConstraints, HeaderGenerator};
use imgbatch_storage::{ProviderHandle, Record, ValueKind};
use std::time::Duration;
use tracing::instrument;
use url::Url;

/// Fetches image bytes from remote URLs or key-value stores.
///
/// Each call makes one logical request: a fresh set of browser headers and a
/// fetch (with the fetcher's own retries) for URLs, or a single store read
/// for store references.
pub struct Resolver {
    stores: ProviderHandle,
    fetcher: FetcherHandle,
    headers: HeaderGenerator,
    constraints: HeaderConstraints,
    timeout: Duration,
    retries: u32,
}
impl Resolver {
    pub fn new(stores: ProviderHandle, fetcher: FetcherHandle) -> Self {
        Self {
            stores,
            fetcher,
            headers: HeaderGenerator::new(),
            constraints: HeaderConstraints::default(),
            timeout: imgbatch_fetch::DEFAULT_TIMEOUT,
            retries: imgbatch_fetch::DEFAULT_RETRIES,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_constraints(mut self, constraints: HeaderConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    #[instrument(level = "debug", skip_all, fields(source = %source))]
    pub async fn resolve(&self, source: &ImageSource) -> Result<Vec<u8>> {
        match source {
            ImageSource::RemoteUrl(url) => self.fetch(url).await,
            ImageSource::StoreRef { store_id, key } => self.read(store_id, key).await,
        }
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let headers = self.headers.generate(&self.constraints).map_err(ErrorKind::fetch)?;
        let request =
            FetchRequest::new(url.clone()).with_headers(headers).with_timeout(self.timeout).with_retries(self.retries);
        let body = self.fetcher.fetch(&request).await.map_err(ErrorKind::fetch)?;
        tracing::debug!(bytes = body.len(), "Fetched remote image");
        Ok(body.to_vec())
    }

    async fn read(&self, store_id: &str, key: &str) -> Result<Vec<u8>> {
        if store_id.is_empty() || key.is_empty() {
            exn::bail!(ErrorKind::MalformedReference(format!("key-value://{store_id}/{key}")));
        }
        let store = self.stores.open(store_id).await.map_err(|e| ErrorKind::store(e, store_id, key))?;
        let record = store.get(key).await.map_err(|e| ErrorKind::store(e, store_id, key))?;
        tracing::debug!(store = store_id, key, content_type = %record.content_type, "Read stored image");
        record_bytes(record)
    }
}

/// Bytes of a stored record, interpreted by its content type.
///
/// Binary records are returned as-is. Text records are byte strings: every
/// character must be in `U+0000..=U+00FF` and maps to the byte of the same
/// value. Structured records are never image data.
fn record_bytes(record: Record) -> Result<Vec<u8>> {
    match record.kind() {
        ValueKind::Binary => Ok(record.data),
        ValueKind::Json => exn::bail!(ErrorKind::UnsupportedValueType(record.content_type)),
        ValueKind::Text => {
            let Ok(text) = String::from_utf8(record.data) else {
                exn::bail!(ErrorKind::UnsupportedValueType("text is not valid UTF-8".to_string()));
            };
            text.chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| exn::Exn::from(ErrorKind::UnsupportedValueType("text outside U+00FF".to_string())))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgbatch_storage::content_type;
    use rstest::rstest;

    #[rstest]
    #[case(Record::binary(vec![0x89, 0x50]), vec![0x89, 0x50])]
    #[case(Record::new(vec![0xFF, 0x00], "image/png"), vec![0xFF, 0x00])]
    #[case(Record::new("ÿØ", "text/plain; charset=utf-8"), vec![0xFF, 0xD8])]
    #[case(Record::new("GIF89a", content_type::TEXT), b"GIF89a".to_vec())]
    fn test_record_bytes(#[case] record: Record, #[case] expected: Vec<u8>) {
        assert_eq!(record_bytes(record).unwrap(), expected);
    }

    #[rstest]
    #[case(Record::new(r#"{"a": 1}"#, content_type::JSON))]
    #[case(Record::new("snowman ☃", content_type::TEXT))]
    #[case(Record::new(vec![0xFF, 0xFE], content_type::TEXT))]
    fn test_record_bytes_rejects(#[case] record: Record) {
        let err = record_bytes(record).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedValueType(_)));
    }
}
