//! Fetching remote images.
//!
//! The [`Fetcher`] trait is the seam between the pipeline and the network:
//! [`HttpFetcher`] is the real implementation, tests substitute their own.
//! Request headers come from [`HeaderGenerator`], which makes requests look
//! like they come from an ordinary desktop browser.

pub mod error;
pub mod headers;
mod http;

pub use crate::headers::{Browser, Device, HeaderConstraints, HeaderGenerator, OperatingSystem};
pub use crate::http::HttpFetcher;
use async_trait::async_trait;
use bytes::Bytes;
pub use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// One logical download: a URL plus how hard to try.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub url: Url,
    pub headers: HeaderMap,
    /// Applies to each attempt separately.
    pub timeout: Duration,
    /// Extra attempts after the first one, for transient failures only.
    pub retries: u32,
}
impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self { url, headers: HeaderMap::new(), timeout: DEFAULT_TIMEOUT, retries: DEFAULT_RETRIES }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Downloads the body of a URL as raw bytes.
///
/// Implementations must reject non-success statuses, empty bodies and
/// textual responses, so that whatever comes back is at least plausibly an
/// image.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> error::Result<Bytes>;
}

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;
